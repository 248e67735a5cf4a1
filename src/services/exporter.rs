//! PDF 导出 - 业务能力层
//!
//! 先把试卷表面按 2 倍截图，再把截图等比缩放到 A4 版心宽度，超过一页
//! 高度时每新增一页把图像的纵向偏移上移一个版心高度，直到剩余高度不
//! 为正。每段文字只出现在它基线所在的那一页。

use std::path::Path;

use encoding_rs::WINDOWS_1252;
use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Document, Object, ObjectId, Stream, StringFormat};
use tracing::{debug, info};

use crate::error::ExportError;
use crate::services::renderer::{PaperSurface, Snapshot};

/// 每毫米的 PDF 点数
const PT_PER_MM: f32 = 72.0 / 25.4;

/// 页面尺寸与边距（毫米）
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageGeometry {
    pub width: f32,
    pub height: f32,
    pub margin: f32,
}

impl PageGeometry {
    pub const A4: PageGeometry = PageGeometry {
        width: 210.0,
        height: 297.0,
        margin: 10.0,
    };

    /// 版心高度
    pub fn printable_height(&self) -> f32 {
        self.height - 2.0 * self.margin
    }

    /// 版心宽度
    pub fn printable_width(&self) -> f32 {
        self.width - 2.0 * self.margin
    }
}

impl Default for PageGeometry {
    fn default() -> Self {
        Self::A4
    }
}

/// 计算每一页上图像顶边的纵向位置（毫米，自页面顶部量起）
///
/// 第一页放在上边距处；之后每页的位置为 `剩余高度 - 图像高度 + 边距`。
pub fn paginate(image_height: f32, page: PageGeometry) -> Vec<f32> {
    let printable = page.printable_height();
    let mut positions = vec![page.margin];
    let mut height_left = image_height - printable;
    while height_left > 0.0 {
        positions.push(height_left - image_height + page.margin);
        height_left -= printable;
    }
    positions
}

/// 导出结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportSummary {
    pub pages: usize,
    pub bytes: usize,
}

/// PDF 导出器
#[derive(Debug, Clone)]
pub struct PdfExporter {
    page: PageGeometry,
    surface_width: f32,
    scale: f32,
}

impl Default for PdfExporter {
    fn default() -> Self {
        Self {
            page: PageGeometry::A4,
            surface_width: 794.0,
            scale: 2.0,
        }
    }
}

impl PdfExporter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_page(mut self, page: PageGeometry) -> Self {
        self.page = page;
        self
    }

    /// 截图倍率，默认 2 倍
    pub fn with_scale(mut self, scale: f32) -> Self {
        self.scale = scale;
        self
    }

    /// 截图试卷表面
    pub fn capture(&self, surface: &PaperSurface) -> Result<Snapshot, ExportError> {
        if surface.is_empty() {
            return Err(ExportError::CaptureFailed {
                reason: "试卷表面没有任何内容".to_string(),
            });
        }
        if !(self.scale > 0.0 && self.surface_width > 0.0) {
            return Err(ExportError::CaptureFailed {
                reason: format!("无效的截图尺寸: 宽 {} 倍率 {}", self.surface_width, self.scale),
            });
        }
        let snapshot = surface.capture(self.surface_width, self.scale);
        debug!(
            "截图完成: {:.0}x{:.0} 像素, {} 段文字",
            snapshot.width,
            snapshot.height,
            snapshot.texts.len()
        );
        Ok(snapshot)
    }

    /// 生成 PDF 字节，返回字节和页数
    pub fn export(&self, surface: &PaperSurface) -> Result<(Vec<u8>, usize), ExportError> {
        let snapshot = self.capture(surface)?;

        let image_width = self.page.printable_width();
        let image_height = image_width / snapshot.ratio();
        let mm_per_px = image_width / snapshot.width;
        let positions = paginate(image_height, self.page);
        debug!(
            "图像尺寸 {:.1}x{:.1}mm, 共 {} 页",
            image_width,
            image_height,
            positions.len()
        );

        let mut writer = PdfWriter::new(self.page);
        for position in &positions {
            let operations = self.page_operations(&snapshot, *position, mm_per_px);
            writer.add_page(operations)?;
        }

        let pages = positions.len();
        let bytes = writer.finish()?;
        Ok((bytes, pages))
    }

    /// 导出并保存到文件
    pub async fn export_to_file(
        &self,
        surface: &PaperSurface,
        path: &Path,
    ) -> Result<ExportSummary, ExportError> {
        let (bytes, pages) = self.export(surface)?;
        tokio::fs::write(path, &bytes)
            .await
            .map_err(|source| ExportError::Io {
                path: path.display().to_string(),
                source,
            })?;
        info!("✓ PDF 已保存至: {} ({} 页)", path.display(), pages);
        Ok(ExportSummary {
            pages,
            bytes: bytes.len(),
        })
    }

    /// 生成一页的绘制指令，只绘制基线落在版心内的内容
    fn page_operations(&self, snapshot: &Snapshot, position: f32, mm_per_px: f32) -> Vec<Operation> {
        let top = self.page.margin;
        let bottom = self.page.height - self.page.margin;
        let visible = |y_mm: f32| y_mm > top && y_mm <= bottom;
        let to_pdf_y = |y_mm: f32| (self.page.height - y_mm) * PT_PER_MM;
        let to_pdf_x = |x_px: f32| (self.page.margin + x_px * mm_per_px) * PT_PER_MM;

        let mut ops = Vec::new();
        for rule in &snapshot.rules {
            let y_mm = position + rule.y * mm_per_px;
            if !visible(y_mm) {
                continue;
            }
            let y = to_pdf_y(y_mm);
            ops.push(Operation::new("w", vec![(rule.thickness * mm_per_px * PT_PER_MM).into()]));
            ops.push(Operation::new("m", vec![to_pdf_x(rule.x1).into(), y.into()]));
            ops.push(Operation::new("l", vec![to_pdf_x(rule.x2).into(), y.into()]));
            ops.push(Operation::new("S", vec![]));
        }

        for text in &snapshot.texts {
            let y_mm = position + text.baseline * mm_per_px;
            if !visible(y_mm) {
                continue;
            }
            let font = if text.bold { "F2" } else { "F1" };
            let size_pt = text.size * mm_per_px * PT_PER_MM;
            ops.push(Operation::new("BT", vec![]));
            ops.push(Operation::new("Tf", vec![font.into(), size_pt.into()]));
            ops.push(Operation::new(
                "Td",
                vec![to_pdf_x(text.x).into(), to_pdf_y(y_mm).into()],
            ));
            ops.push(Operation::new(
                "Tj",
                vec![Object::String(encode_win_ansi(&text.text), StringFormat::Literal)],
            ));
            ops.push(Operation::new("ET", vec![]));
        }
        ops
    }
}

/// 编码为 WinAnsi，无法表示的字符替换为 `?`
fn encode_win_ansi(text: &str) -> Vec<u8> {
    let mut out = Vec::with_capacity(text.len());
    let mut buf = [0u8; 4];
    for ch in text.chars() {
        let (bytes, _, had_errors) = WINDOWS_1252.encode(ch.encode_utf8(&mut buf));
        if had_errors {
            out.push(b'?');
        } else {
            out.extend_from_slice(&bytes);
        }
    }
    out
}

/// 基于 lopdf 的最小 PDF 写入器
struct PdfWriter {
    doc: Document,
    pages_id: ObjectId,
    resources_id: ObjectId,
    kids: Vec<Object>,
    page: PageGeometry,
}

impl PdfWriter {
    fn new(page: PageGeometry) -> Self {
        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();
        let regular = doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => "Times-Roman",
            "Encoding" => "WinAnsiEncoding",
        });
        let bold = doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => "Times-Bold",
            "Encoding" => "WinAnsiEncoding",
        });
        let resources_id = doc.add_object(dictionary! {
            "Font" => dictionary! {
                "F1" => regular,
                "F2" => bold,
            },
        });
        Self {
            doc,
            pages_id,
            resources_id,
            kids: Vec::new(),
            page,
        }
    }

    fn add_page(&mut self, operations: Vec<Operation>) -> Result<(), ExportError> {
        let content = Content { operations }.encode()?;
        let content_id = self.doc.add_object(Stream::new(dictionary! {}, content));
        let page_id = self.doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => self.pages_id,
            "Contents" => content_id,
        });
        self.kids.push(page_id.into());
        Ok(())
    }

    fn finish(mut self) -> Result<Vec<u8>, ExportError> {
        let count = self.kids.len() as i64;
        let media_box: Vec<Object> = vec![
            0.into(),
            0.into(),
            (self.page.width * PT_PER_MM).into(),
            (self.page.height * PT_PER_MM).into(),
        ];
        self.doc.objects.insert(
            self.pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => self.kids,
                "Count" => count,
                "Resources" => self.resources_id,
                "MediaBox" => media_box,
            }),
        );
        let catalog_id = self.doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => self.pages_id,
        });
        self.doc.trailer.set("Root", catalog_id);

        let mut bytes = Vec::new();
        self.doc
            .save_to(&mut bytes)
            .map_err(|source| ExportError::Io {
                path: "<memory>".to_string(),
                source,
            })?;
        Ok(bytes)
    }
}
