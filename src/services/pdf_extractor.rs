//! PDF 文本提取 - 业务能力层
//!
//! 按页读取内容流中的文本片段：同一页的片段用一个空格连接，每页末尾
//! 追加换行。只读取文本层，扫描件不会得到任何文本。
//!
//! 字符串按当前字体（`Tf`）的编码解码，包括 Type0 字体的 ToUnicode 映射。
//! 字体既没有 /Encoding 也没有 /ToUnicode 时按 WinAnsi 解码。

use std::collections::BTreeMap;

use encoding_rs::{UTF_16BE, WINDOWS_1252};
use lopdf::content::Content;
use lopdf::{Dictionary, Document, Encoding, Object, ObjectId};
use tracing::{debug, info, warn};

use crate::error::ExtractionError;
use crate::models::SyllabusFile;
use crate::utils::logging::truncate_text;

/// TJ 数组中小于该值的间距视为单词间隔（千分之一文字空间单位）
const TJ_WORD_GAP: f32 = -250.0;

/// PDF 文本提取器
#[derive(Debug, Clone, Copy, Default)]
pub struct PdfTextExtractor;

impl PdfTextExtractor {
    pub fn new() -> Self {
        Self
    }

    /// 提取上传文件的全部文本
    ///
    /// 解析在阻塞线程池中进行，调用方等待期间不会阻塞运行时。
    pub async fn extract(&self, file: &SyllabusFile) -> Result<String, ExtractionError> {
        if file.exceeds_soft_limit() {
            warn!(
                "⚠️ 大纲文件 {} 超过 10MB ({} 字节)，提取可能较慢",
                file.file_name,
                file.len()
            );
        }

        info!("📄 正在提取 PDF 文本: {}", file.file_name);
        let bytes = file.bytes.clone();
        let text = tokio::task::spawn_blocking(move || extract_text_from_bytes(&bytes)).await??;

        info!("✓ 提取完成，共 {} 个字符", text.chars().count());
        debug!("提取内容预览: {}", truncate_text(&text, 80));
        Ok(text)
    }
}

/// 从内存中的 PDF 提取全部文本
pub fn extract_text_from_bytes(bytes: &[u8]) -> Result<String, ExtractionError> {
    let pages = extract_page_runs(bytes)?;
    Ok(join_page_runs(&pages))
}

/// 逐页读取文本片段
pub fn extract_page_runs(bytes: &[u8]) -> Result<Vec<Vec<String>>, ExtractionError> {
    if bytes.is_empty() {
        return Err(ExtractionError::Empty);
    }

    let doc = Document::load_mem(bytes).map_err(ExtractionError::Malformed)?;
    let pages = doc.get_pages();
    debug!("PDF 共 {} 页", pages.len());

    // get_pages 按页码升序返回
    pages
        .into_iter()
        .map(|(page_number, page_id)| {
            let page_content = |source| ExtractionError::PageContent {
                page: page_number,
                source,
            };
            let raw = doc.get_page_content(page_id).map_err(page_content)?;
            let content = Content::decode(&raw).map_err(page_content)?;
            let mut fonts = FontDecoder::for_page(&doc, page_id);
            Ok(text_runs(&content, &mut fonts))
        })
        .collect()
}

/// 把每页的片段用空格连接，页与页之间以换行分隔
pub fn join_page_runs(pages: &[Vec<String>]) -> String {
    pages.iter().fold(String::new(), |mut text, runs| {
        text.push_str(&runs.join(" "));
        text.push('\n');
        text
    })
}

/// 一页的字体编码表，以及内容流中当前选中的字体
#[derive(Default)]
struct FontDecoder<'a> {
    encodings: BTreeMap<Vec<u8>, Encoding<'a>>,
    current: Option<Vec<u8>>,
}

impl<'a> FontDecoder<'a> {
    fn for_page(doc: &'a Document, page_id: ObjectId) -> Self {
        let fonts = match doc.get_page_fonts(page_id) {
            Ok(fonts) => fonts,
            Err(e) => {
                debug!("读取页面字体失败，按 WinAnsi 解码: {}", e);
                return Self::default();
            }
        };

        let encodings = fonts
            .into_iter()
            .filter_map(|(name, font)| {
                let encoding = font_encoding(doc, font)?;
                Some((name, encoding))
            })
            .collect();
        Self {
            encodings,
            current: None,
        }
    }

    /// 处理 Tf 操作符
    fn select(&mut self, operands: &[Object]) {
        self.current = operands
            .first()
            .and_then(|name| name.as_name().ok())
            .map(<[u8]>::to_vec);
    }

    fn decode(&self, bytes: &[u8]) -> String {
        let encoding = self
            .current
            .as_ref()
            .and_then(|name| self.encodings.get(name));
        match encoding.map(|encoding| Document::decode_text(encoding, bytes)) {
            Some(Ok(text)) => text,
            Some(Err(e)) => {
                debug!("字体编码无法解码，按 WinAnsi 解码: {}", e);
                decode_pdf_bytes(bytes)
            }
            None => decode_pdf_bytes(bytes),
        }
    }
}

/// 字体声明了编码或 ToUnicode 时才使用 lopdf 的解码表
fn font_encoding<'a>(doc: &'a Document, font: &'a Dictionary) -> Option<Encoding<'a>> {
    if !font.has(b"Encoding") && !font.has(b"ToUnicode") {
        return None;
    }
    font.get_font_encoding(doc)
        .map_err(|e| debug!("无法读取字体编码: {}", e))
        .ok()
}

/// 收集内容流中的文本显示操作
fn text_runs(content: &Content, fonts: &mut FontDecoder) -> Vec<String> {
    let mut runs = Vec::new();
    for op in &content.operations {
        let run = match op.operator.as_str() {
            "Tf" => {
                fonts.select(&op.operands);
                None
            }
            "Tj" | "'" => op.operands.last().and_then(|s| decode_string(s, fonts)),
            // " 操作符的最后一个操作数是字符串
            "\"" => op.operands.get(2).and_then(|s| decode_string(s, fonts)),
            "TJ" => op.operands.first().and_then(|a| decode_array(a, fonts)),
            _ => None,
        };
        runs.extend(run);
    }
    runs
}

fn decode_array(operand: &Object, fonts: &FontDecoder) -> Option<String> {
    let Object::Array(items) = operand else {
        return None;
    };
    let mut run = String::new();
    for item in items {
        match item {
            Object::String(..) => {
                if let Some(text) = decode_string(item, fonts) {
                    run.push_str(&text);
                }
            }
            spacing => {
                if spacing.as_float().is_ok_and(|gap| gap <= TJ_WORD_GAP) {
                    run.push(' ');
                }
            }
        }
    }
    Some(run)
}

fn decode_string(operand: &Object, fonts: &FontDecoder) -> Option<String> {
    let Object::String(bytes, _) = operand else {
        return None;
    };
    Some(fonts.decode(bytes))
}

/// 解码 PDF 字符串：带 BOM 的按 UTF-16BE，其余按 WinAnsi
fn decode_pdf_bytes(bytes: &[u8]) -> String {
    match bytes {
        [0xFE, 0xFF, rest @ ..] => UTF_16BE.decode_without_bom_handling(rest).0.into_owned(),
        _ => WINDOWS_1252.decode_without_bom_handling(bytes).0.into_owned(),
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use lopdf::content::Operation;
    use lopdf::{dictionary, Stream, StringFormat};

    /// 构造一个每页包含给定文本片段的 PDF
    pub(crate) fn pdf_with_pages(pages: &[&[&str]]) -> Vec<u8> {
        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();
        let font_id = doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => "Courier",
        });
        let resources_id = doc.add_object(dictionary! {
            "Font" => dictionary! { "F1" => font_id },
        });

        let mut kids = Vec::new();
        for runs in pages {
            let mut operations = vec![
                Operation::new("BT", vec![]),
                Operation::new("Tf", vec!["F1".into(), 12.into()]),
            ];
            for (i, run) in runs.iter().enumerate() {
                operations.push(Operation::new("Td", vec![72.into(), (700 - 20 * i as i64).into()]));
                operations.push(Operation::new("Tj", vec![Object::string_literal(*run)]));
            }
            operations.push(Operation::new("ET", vec![]));
            let content = Content { operations };
            let content_id = doc.add_object(Stream::new(dictionary! {}, content.encode().unwrap()));
            let page_id = doc.add_object(dictionary! {
                "Type" => "Page",
                "Parent" => pages_id,
                "Contents" => content_id,
            });
            kids.push(page_id.into());
        }

        let count = kids.len() as i64;
        doc.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => kids,
                "Count" => count,
                "Resources" => resources_id,
                "MediaBox" => vec![0.into(), 0.into(), 595.into(), 842.into()],
            }),
        );
        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        doc.trailer.set("Root", catalog_id);

        let mut bytes = Vec::new();
        doc.save_to(&mut bytes).unwrap();
        bytes
    }

    #[test]
    fn joins_runs_with_spaces_and_pages_with_newlines() {
        let pages = vec![
            vec!["A".to_string(), "B".to_string()],
            vec!["C".to_string()],
            vec!["D".to_string(), "E".to_string()],
        ];
        assert_eq!(join_page_runs(&pages), "A B\nC\nD E\n");
    }

    #[test]
    fn extracts_three_page_document() {
        let bytes = pdf_with_pages(&[&["A", "B"], &["C"], &["D", "E"]]);
        assert_eq!(extract_text_from_bytes(&bytes).unwrap(), "A B\nC\nD E\n");
    }

    #[test]
    fn page_without_text_yields_empty_line() {
        let bytes = pdf_with_pages(&[&["Kinematics"], &[]]);
        assert_eq!(extract_text_from_bytes(&bytes).unwrap(), "Kinematics\n\n");
    }

    #[test]
    fn tj_arrays_join_fragments_and_wide_gaps() {
        let content = Content {
            operations: vec![Operation::new(
                "TJ",
                vec![Object::Array(vec![
                    Object::String(b"Ne".to_vec(), StringFormat::Literal),
                    Object::Integer(-20),
                    Object::String(b"wton".to_vec(), StringFormat::Literal),
                    Object::Integer(-400),
                    Object::String(b"laws".to_vec(), StringFormat::Literal),
                ])],
            )],
        };
        assert_eq!(
            text_runs(&content, &mut FontDecoder::default()),
            vec!["Newton laws".to_string()]
        );
    }

    #[test]
    fn decodes_utf16_strings_with_bom() {
        let bytes = [0xFE, 0xFF, 0x00, 0x48, 0x00, 0x69];
        assert_eq!(decode_pdf_bytes(&bytes), "Hi");
    }

    /// 单页 PDF，字体为 Identity-H 编码的 Type0，字形码通过 ToUnicode 映射
    fn type0_pdf(glyphs: &[u8]) -> Vec<u8> {
        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();
        let cmap_id = doc.add_object(Stream::new(
            dictionary! {},
            b"/CIDInit /ProcSet findresource begin
12 dict begin
begincmap
/CMapName /Adobe-Identity-UCS def
/CMapType 2 def
1 begincodespacerange
<0000> <FFFF>
endcodespacerange
2 beginbfchar
<0001> <0048>
<0002> <0069>
endbfchar
endcmap
CMapName currentdict /CMap defineresource pop
end
end"
            .to_vec(),
        ));
        let font_id = doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type0",
            "BaseFont" => "NotoSans",
            "Encoding" => "Identity-H",
            "ToUnicode" => cmap_id,
        });
        let content = Content {
            operations: vec![
                Operation::new("BT", vec![]),
                Operation::new("Tf", vec!["F1".into(), 12.into()]),
                Operation::new("Td", vec![72.into(), 700.into()]),
                Operation::new(
                    "Tj",
                    vec![Object::String(glyphs.to_vec(), StringFormat::Hexadecimal)],
                ),
                Operation::new("ET", vec![]),
            ],
        };
        let content_id = doc.add_object(Stream::new(dictionary! {}, content.encode().unwrap()));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
            "Resources" => dictionary! {
                "Font" => dictionary! { "F1" => font_id },
            },
        });
        doc.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => vec![page_id.into()],
                "Count" => 1,
                "MediaBox" => vec![0.into(), 0.into(), 595.into(), 842.into()],
            }),
        );
        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        doc.trailer.set("Root", catalog_id);

        let mut bytes = Vec::new();
        doc.save_to(&mut bytes).unwrap();
        bytes
    }

    #[test]
    fn type0_fonts_decode_through_to_unicode() {
        let bytes = type0_pdf(&[0x00, 0x01, 0x00, 0x02]);
        assert_eq!(extract_text_from_bytes(&bytes).unwrap(), "Hi\n");
    }

    #[test]
    fn win_ansi_fonts_keep_apostrophes() {
        // 导出器写出的字体带 WinAnsiEncoding
        let doc = Document::with_version("1.5");
        let times = dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => "Times-Roman",
            "Encoding" => "WinAnsiEncoding",
        };
        let mut fonts = FontDecoder::default();
        fonts
            .encodings
            .extend(font_encoding(&doc, &times).map(|e| (b"F1".to_vec(), e)));
        assert_eq!(fonts.encodings.len(), 1);

        let content = Content {
            operations: vec![
                Operation::new("Tf", vec!["F1".into(), 12.into()]),
                Operation::new("Tj", vec![Object::string_literal("Newton's law")]),
            ],
        };
        assert_eq!(text_runs(&content, &mut fonts), vec!["Newton's law".to_string()]);
    }

    #[test]
    fn fonts_without_encoding_fall_back_to_win_ansi() {
        let doc = Document::with_version("1.5");
        let courier = dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => "Courier",
        };
        assert!(font_encoding(&doc, &courier).is_none());
    }

    #[test]
    fn malformed_input_is_rejected() {
        assert!(matches!(
            extract_text_from_bytes(b"definitely not a pdf"),
            Err(ExtractionError::Malformed(_))
        ));
        assert!(matches!(
            extract_text_from_bytes(&[]),
            Err(ExtractionError::Empty)
        ));
    }

    #[tokio::test]
    async fn extract_runs_off_the_async_thread() {
        let bytes = pdf_with_pages(&[&["Optics"]]);
        let file = SyllabusFile::new("syllabus.pdf", bytes);
        let text = PdfTextExtractor::new().extract(&file).await.unwrap();
        assert_eq!(text, "Optics\n");
    }
}
