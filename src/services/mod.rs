//! 业务能力层（Services）
//!
//! 每个服务只描述"我能做什么"，不关心向导当前处于哪一步。

pub mod exporter;
pub mod form_store;
pub mod paper_client;
pub mod pdf_extractor;
pub mod renderer;

pub use exporter::{paginate, ExportSummary, PageGeometry, PdfExporter};
pub use form_store::FormStateStore;
pub use paper_client::PaperGenerationClient;
pub use pdf_extractor::PdfTextExtractor;
pub use renderer::{Block, PaperSurface, Snapshot};
