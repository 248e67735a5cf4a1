//! 试卷生成客户端 - 业务能力层
//!
//! 把向导状态编码为 multipart 表单，POST 到生成接口，并把响应解析为
//! `GeneratedPaper`。
//!
//! ## 请求字段
//! - `schoolName` / `maxMarks` / `overallDifficulty` / `syllabusText`：文本
//! - `sections`：JSON 数组 `[{name, difficulty, marksDistribution}]`
//! - `syllabusFile`：可选，PDF 原始字节

use std::future::Future;
use std::time::Duration;

use reqwest::multipart::{Form, Part};
use serde_json::Value;
use tracing::{debug, error, info, warn};

use crate::config::Config;
use crate::error::{ApiError, UNKNOWN_SERVER_ERROR_MESSAGE};
use crate::models::{GeneratedPaper, WizardState};

/// 试卷生成客户端
#[derive(Debug, Clone)]
pub struct PaperGenerationClient {
    http: reqwest::Client,
    endpoint: String,
    timeout: Option<Duration>,
}

impl PaperGenerationClient {
    /// 根据配置创建客户端
    pub fn new(config: &Config) -> Self {
        Self::with_endpoint(&config.backend_url, config.request_timeout())
    }

    /// 使用自定义地址和超时创建客户端
    pub fn with_endpoint(endpoint: impl Into<String>, timeout: Option<Duration>) -> Self {
        Self {
            http: reqwest::Client::new(),
            endpoint: endpoint.into(),
            timeout,
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// 提交向导状态并等待生成结果
    pub async fn submit(&self, state: &WizardState) -> Result<GeneratedPaper, ApiError> {
        self.submit_cancellable(state, std::future::pending()).await
    }

    /// 提交向导状态，`cancel` 先完成时放弃等待
    ///
    /// 超时和取消都只是不再等待，后端可能仍会完成这次生成。两者同时
    /// 就绪时以取消为准。
    pub async fn submit_cancellable<C>(
        &self,
        state: &WizardState,
        cancel: C,
    ) -> Result<GeneratedPaper, ApiError>
    where
        C: Future<Output = ()>,
    {
        let request = async {
            match self.timeout {
                Some(limit) => tokio::time::timeout(limit, self.send(state))
                    .await
                    .map_err(|_| ApiError::TimedOut {
                        endpoint: self.endpoint.clone(),
                        secs: limit.as_secs(),
                    })?,
                None => self.send(state).await,
            }
        };

        tokio::select! {
            biased;
            _ = cancel => {
                warn!("⚠️ 用户取消了试卷生成请求");
                Err(ApiError::Cancelled)
            }
            result = request => result,
        }
    }

    async fn send(&self, state: &WizardState) -> Result<GeneratedPaper, ApiError> {
        let form = build_form(state)?;

        info!("📤 正在请求生成试卷: {}", self.endpoint);
        debug!(
            "学校: {} | 满分: {} | 难度: {} | 大题数: {}",
            state.school_name,
            state.max_marks,
            state.overall_difficulty,
            state.sections.len()
        );

        let response = self
            .http
            .post(&self.endpoint)
            .multipart(form)
            .send()
            .await
            .map_err(|source| {
                error!("无法连接到生成服务 {}: {}", self.endpoint, source);
                ApiError::Unreachable {
                    endpoint: self.endpoint.clone(),
                    source,
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = server_error_message(status.as_u16(), &body);
            error!("生成服务返回错误 ({}): {}", status.as_u16(), message);
            return Err(ApiError::Server {
                status: status.as_u16(),
                message,
            });
        }

        let body = response.bytes().await.map_err(|source| ApiError::Unreachable {
            endpoint: self.endpoint.clone(),
            source,
        })?;
        let paper: GeneratedPaper =
            serde_json::from_slice(&body).map_err(|e| ApiError::InvalidPaper {
                source: Box::new(e),
            })?;

        info!(
            "✓ 试卷生成成功: {} ({} 个大题, {} 道题)",
            paper.paper_title,
            paper.sections.len(),
            paper.question_count()
        );
        Ok(paper)
    }
}

/// 构建 multipart 表单
pub fn build_form(state: &WizardState) -> Result<Form, ApiError> {
    let sections = serde_json::to_string(&state.sections).map_err(|e| ApiError::Encode {
        source: Box::new(e),
    })?;

    let form = Form::new()
        .text("schoolName", state.school_name.clone())
        .text("maxMarks", state.max_marks.to_string())
        .text("overallDifficulty", state.overall_difficulty.as_str())
        .text("syllabusText", state.syllabus_text.clone())
        .text("sections", sections);

    let Some(file) = &state.syllabus_file else {
        return Ok(form);
    };

    let part = Part::bytes(file.bytes.to_vec())
        .file_name(file.file_name.clone())
        .mime_str("application/pdf")
        .map_err(|e| ApiError::Encode {
            source: Box::new(e),
        })?;
    Ok(form.part("syllabusFile", part))
}

/// 从错误响应体中取出给用户看的提示
///
/// - 响应体不是 JSON：通用提示
/// - `detail` 是非空字符串：原样返回
/// - `detail` 是其他非空值：返回其 JSON 文本
/// - 没有 `detail`：`HTTP error! status: <code>`
pub fn server_error_message(status: u16, body: &str) -> String {
    let Ok(parsed) = serde_json::from_str::<Value>(body) else {
        return UNKNOWN_SERVER_ERROR_MESSAGE.to_string();
    };

    match parsed.get("detail") {
        Some(Value::String(detail)) if !detail.is_empty() => detail.clone(),
        Some(Value::Null) | Some(Value::String(_)) | None => {
            format!("HTTP error! status: {}", status)
        }
        Some(other) => other.to_string(),
    }
}
