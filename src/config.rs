use std::time::Duration;

/// 程序配置
#[derive(Clone, Debug)]
pub struct Config {
    /// 试卷生成接口地址
    pub backend_url: String,
    /// 生成请求的超时时间（秒），0 表示不限时
    pub request_timeout_secs: u64,
    /// 向导草稿 TOML 文件
    pub draft_file: String,
    /// 导出的 PDF 文件
    pub output_pdf: String,
    /// 生成后自动全选题目（非交互模式）
    pub auto_select_all: bool,
    /// 是否显示详细日志
    pub verbose_logging: bool,
    /// 输出日志文件
    pub output_log_file: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            backend_url: "http://127.0.0.1:8000/generate-paper-v2".to_string(),
            request_timeout_secs: 300,
            draft_file: "paper_draft.toml".to_string(),
            output_pdf: "question-paper.pdf".to_string(),
            auto_select_all: false,
            verbose_logging: false,
            output_log_file: "output.txt".to_string(),
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        let default = Self::default();
        Self {
            backend_url: std::env::var("PAPER_BACKEND_URL").unwrap_or(default.backend_url),
            request_timeout_secs: std::env::var("REQUEST_TIMEOUT_SECS").ok().and_then(|v| v.parse().ok()).unwrap_or(default.request_timeout_secs),
            draft_file: std::env::var("DRAFT_FILE").unwrap_or(default.draft_file),
            output_pdf: std::env::var("OUTPUT_PDF").unwrap_or(default.output_pdf),
            auto_select_all: std::env::var("AUTO_SELECT_ALL").ok().and_then(|v| v.parse().ok()).unwrap_or(default.auto_select_all),
            verbose_logging: std::env::var("VERBOSE_LOGGING").ok().and_then(|v| v.parse().ok()).unwrap_or(default.verbose_logging),
            output_log_file: std::env::var("OUTPUT_LOG_FILE").unwrap_or(default.output_log_file),
        }
    }

    /// 生成请求的超时时间，未配置时返回 None
    pub fn request_timeout(&self) -> Option<Duration> {
        match self.request_timeout_secs {
            0 => None,
            secs => Some(Duration::from_secs(secs)),
        }
    }
}
