//! 错误类型
//!
//! 按照失败的来源分为四类：
//! - 校验失败（本地，阻止步骤切换，可通过修改输入恢复）
//! - PDF 提取失败（可退回手动输入）
//! - 网络/传输失败（通用可重试提示，不自动重试）
//! - 服务端报错（尽量原样展示后端的 detail）
//!
//! 所有错误都不会终止进程，向导停留在当前步骤，状态保持不变。

use thiserror::Error;

/// 提取失败时展示给用户的固定提示
pub const EXTRACTION_FALLBACK_MESSAGE: &str =
    "Failed to extract text from PDF. Please try another file or enter text manually.";

/// 无法连接后端时的提示
pub const BACKEND_UNREACHABLE_MESSAGE: &str =
    "Failed to connect to the backend. Please ensure it is running.";

/// 错误响应体不是 JSON 时的兜底提示
pub const UNKNOWN_SERVER_ERROR_MESSAGE: &str = "An unknown error occurred.";

/// 导出表面尚未渲染时的提示
pub const EXPORT_UNAVAILABLE_MESSAGE: &str =
    "PDF generation library not loaded yet. Please wait a moment and try again.";

/// 截图或分页过程中出错的提示
pub const EXPORT_FAILED_MESSAGE: &str = "An error occurred during PDF conversion. Please try again.";

/// 应用程序错误类型
#[derive(Debug, Error)]
pub enum AppError {
    /// 校验错误
    #[error(transparent)]
    Validation(#[from] ValidationError),
    /// PDF 文本提取错误
    #[error(transparent)]
    Extraction(#[from] ExtractionError),
    /// 生成接口错误
    #[error(transparent)]
    Api(#[from] ApiError),
    /// 导出错误
    #[error(transparent)]
    Export(#[from] ExportError),
    /// 文件操作错误
    #[error("文件错误 ({path}): {source}")]
    File {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

impl AppError {
    /// 创建文件读取错误
    pub fn file_read_failed(path: impl Into<String>, source: std::io::Error) -> Self {
        AppError::File {
            path: path.into(),
            source,
        }
    }

    /// 展示给用户的提示文本
    ///
    /// 提取失败时不暴露底层原因，只给出固定的兜底提示；其余错误的
    /// Display 本身就是面向用户的文本。
    pub fn user_message(&self) -> String {
        match self {
            AppError::Extraction(_) => EXTRACTION_FALLBACK_MESSAGE.to_string(),
            other => other.to_string(),
        }
    }

    /// 是否值得让用户直接重试
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            AppError::Api(ApiError::Unreachable { .. })
                | AppError::Api(ApiError::TimedOut { .. })
                | AppError::Api(ApiError::Cancelled)
                | AppError::Export(ExportError::LibraryUnavailable)
        )
    }
}

/// 步骤校验错误
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("School name is required.")]
    MissingSchoolName,

    #[error("Maximum marks must be greater than zero.")]
    NonPositiveMaxMarks,

    #[error("Provide the syllabus as text or upload a PDF.")]
    MissingSyllabus,

    #[error("Add at least one section.")]
    NoSections,

    #[error("The sections must carry at least one mark in total.")]
    ZeroWeightedMarks,

    #[error("Select at least one question.")]
    NoQuestionsSelected,

    #[error("Please ensure all previous steps are filled correctly.")]
    PreviousStepsInvalid,

    /// 从 Sections 前进必须走生成请求
    #[error("Generate the paper to continue.")]
    GenerationRequired,

    #[error("Section {index} does not exist ({len} sections).")]
    SectionIndexOutOfRange { index: usize, len: usize },

    #[error("Question {number} does not exist ({count} questions).")]
    QuestionOutOfRange { number: usize, count: usize },

    #[error("No paper has been generated yet.")]
    NoGeneratedPaper,

    #[error("This action is only available on the {expected} step.")]
    WrongStep { expected: &'static str },

    #[error("Block {index} does not exist ({len} blocks).")]
    BlockOutOfRange { index: usize, len: usize },

    #[error("Block {index} has no editable text.")]
    BlockNotEditable { index: usize },
}

/// PDF 文本提取错误
#[derive(Debug, Error)]
pub enum ExtractionError {
    /// 文件不是合法的 PDF
    #[error("无法解析 PDF: {0}")]
    Malformed(#[source] lopdf::Error),

    /// 某一页的内容流无法解码
    #[error("无法解码第 {page} 页内容: {source}")]
    PageContent {
        page: u32,
        #[source]
        source: lopdf::Error,
    },

    /// 文件为空
    #[error("PDF 文件为空")]
    Empty,

    /// 后台提取任务异常退出
    #[error("PDF 提取任务异常退出: {0}")]
    Task(#[from] tokio::task::JoinError),
}

/// 生成接口错误
#[derive(Debug, Error)]
pub enum ApiError {
    /// 没有收到任何响应
    #[error("{}", BACKEND_UNREACHABLE_MESSAGE)]
    Unreachable {
        endpoint: String,
        #[source]
        source: reqwest::Error,
    },

    /// 超过配置的等待时间
    #[error("The generation request to {endpoint} timed out after {secs} seconds.")]
    TimedOut { endpoint: String, secs: u64 },

    /// 用户取消了等待
    #[error("The generation request was cancelled.")]
    Cancelled,

    /// 后端返回了非 2xx 响应
    #[error("{message}")]
    Server { status: u16, message: String },

    /// 2xx 响应体无法解析为试卷
    #[error("The backend returned a paper that could not be read: {source}")]
    InvalidPaper {
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// 请求体构建失败
    #[error("Failed to encode the generation request: {source}")]
    Encode {
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

/// 导出错误
#[derive(Debug, Error)]
pub enum ExportError {
    /// 尚未渲染试卷表面
    #[error("{}", EXPORT_UNAVAILABLE_MESSAGE)]
    LibraryUnavailable,

    /// 截图阶段失败
    #[error("{}", EXPORT_FAILED_MESSAGE)]
    CaptureFailed { reason: String },

    /// PDF 写入失败
    #[error("{}", EXPORT_FAILED_MESSAGE)]
    Pdf(#[from] lopdf::Error),

    /// 文件写入失败
    #[error("无法保存 PDF ({path}): {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

/// 应用程序结果类型
pub type AppResult<T> = Result<T, AppError>;
