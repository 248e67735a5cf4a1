//! 向导流程控制 - 流程层
//!
//! 核心职责：持有当前步骤，按步骤校验输入，决定能否前进或后退
//!
//! 步骤顺序：
//! 1. Basic Info → 学校名非空、满分大于 0
//! 2. Syllabus → 文本或 PDF 至少一个
//! 3. Sections → 只能通过生成请求前进，失败时停留在本步
//! 4. Select Questions → 至少选一道题，前进时渲染试卷表面
//! 5. Finalize & Export → 可编辑表面并导出 PDF
//!
//! 任何失败都不改变当前步骤和已填写的内容，错误提示保存在
//! `last_error` 中供界面展示。

use std::future::Future;
use std::path::Path;

use tracing::{info, warn};

use crate::error::{AppError, AppResult, ExportError, ValidationError};
use crate::models::{GeneratedPaper, Question, SelectedQuestions, SyllabusFile, WizardPatch, WizardState};
use crate::services::{
    ExportSummary, FormStateStore, PaperGenerationClient, PaperSurface, PdfExporter,
    PdfTextExtractor,
};
use crate::workflow::wizard_step::WizardStep;

/// 向导控制器
///
/// - 持有表单状态、当前步骤和渲染后的试卷表面
/// - 每个操作都需要 `&mut self`，同一时间只会有一个请求在进行
#[derive(Debug, Default)]
pub struct WizardController {
    store: FormStateStore,
    step: WizardStep,
    last_error: Option<String>,
    surface: Option<PaperSurface>,
}

impl WizardController {
    pub fn new() -> Self {
        Self::default()
    }

    /// 使用已有的向导输入创建控制器（例如从草稿文件加载）
    pub fn with_state(state: WizardState) -> Self {
        Self {
            store: FormStateStore::with_state(state),
            ..Self::default()
        }
    }

    pub fn step(&self) -> WizardStep {
        self.step
    }

    pub fn state(&self) -> &WizardState {
        self.store.state()
    }

    pub fn store(&self) -> &FormStateStore {
        &self.store
    }

    /// 表单编辑入口
    pub fn store_mut(&mut self) -> &mut FormStateStore {
        &mut self.store
    }

    pub fn paper(&self) -> Option<&GeneratedPaper> {
        self.store.paper()
    }

    pub fn selected(&self) -> &SelectedQuestions {
        self.store.selected()
    }

    /// 最近一次失败的提示，成功的操作会清除它
    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    pub fn surface(&self) -> Option<&PaperSurface> {
        self.surface.as_ref()
    }

    /// 对渲染后的表面做自由编辑，编辑不会回写到已选题目
    pub fn surface_mut(&mut self) -> Option<&mut PaperSurface> {
        self.surface.as_mut()
    }

    // ========== 步骤切换 ==========

    /// 校验当前步骤并前进一步
    ///
    /// Sections 只能通过 [`generate`](Self::generate) 前进；最后一步上调用
    /// 不做任何事。
    pub fn next(&mut self) -> Result<WizardStep, ValidationError> {
        if let Err(e) = self.check_current_step() {
            warn!("⚠️ {} 校验未通过: {}", self.step.label(), e);
            self.last_error = Some(e.to_string());
            return Err(e);
        }

        let Some(next) = self.step.next() else {
            return Ok(self.step);
        };
        if next == WizardStep::FinalizeExport {
            self.render();
        }
        self.step = next;
        self.last_error = None;
        info!("➡️ 进入步骤 {}", self.step);
        Ok(self.step)
    }

    /// 后退一步，第一步上调用不做任何事
    pub fn back(&mut self) -> WizardStep {
        if let Some(prev) = self.step.prev() {
            self.step = prev;
            self.last_error = None;
            info!("⬅️ 返回步骤 {}", self.step);
        }
        self.step
    }

    fn check_current_step(&self) -> Result<(), ValidationError> {
        let state = self.store.state();
        match self.step {
            WizardStep::BasicInfo => state.validate_basic_info(),
            WizardStep::Syllabus => state.validate_syllabus(),
            WizardStep::Sections => Err(ValidationError::GenerationRequired),
            WizardStep::SelectQuestions => {
                if self.store.selected().is_empty() {
                    Err(ValidationError::NoQuestionsSelected)
                } else {
                    Ok(())
                }
            }
            WizardStep::FinalizeExport => Ok(()),
        }
    }

    fn require_step(&self, expected: WizardStep) -> Result<(), ValidationError> {
        if self.step != expected {
            return Err(ValidationError::WrongStep {
                expected: expected.label(),
            });
        }
        Ok(())
    }

    /// 记录失败提示后原样返回错误
    fn record<T>(&mut self, result: AppResult<T>) -> AppResult<T> {
        match &result {
            Ok(_) => self.last_error = None,
            Err(e) => self.last_error = Some(e.user_message()),
        }
        result
    }

    // ========== 大纲 ==========

    /// 上传大纲 PDF
    ///
    /// 提取成功时把文本写入 `syllabus_text` 并附加文件；失败时不附加，
    /// 给出固定提示，用户仍可手动输入大纲。
    pub async fn attach_syllabus(
        &mut self,
        file: SyllabusFile,
        extractor: &PdfTextExtractor,
    ) -> AppResult<&WizardState> {
        let extracted = extractor.extract(&file).await.map_err(AppError::from);
        let text = match self.record(extracted) {
            Ok(text) => text,
            Err(e) => {
                warn!("⚠️ 大纲提取失败，保留手动输入: {}", e);
                return Err(e);
            }
        };
        Ok(self.store.replace(
            WizardPatch::default()
                .syllabus_text(text)
                .syllabus_file(Some(file)),
        ))
    }

    /// 从磁盘读取大纲 PDF 并上传
    pub async fn attach_syllabus_path(
        &mut self,
        path: &Path,
        extractor: &PdfTextExtractor,
    ) -> AppResult<&WizardState> {
        let read = tokio::fs::read(path)
            .await
            .map_err(|e| AppError::file_read_failed(path.display().to_string(), e));
        let bytes = self.record(read)?;
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "syllabus.pdf".to_string());
        self.attach_syllabus(SyllabusFile::new(file_name, bytes), extractor)
            .await
    }

    /// 移除已上传的文件，保留已提取的文本
    pub fn detach_syllabus(&mut self) -> &WizardState {
        self.store
            .replace(WizardPatch::default().syllabus_file(None))
    }

    // ========== 生成 ==========

    /// 提交生成请求，成功后进入 Select Questions
    pub async fn generate(&mut self, client: &PaperGenerationClient) -> AppResult<&GeneratedPaper> {
        self.generate_cancellable(client, std::future::pending())
            .await
    }

    /// 可取消的生成请求
    ///
    /// 只能在 Sections 步骤调用，并要求前三步全部有效。请求前清空旧试卷
    /// 和已选题目；失败时停留在 Sections。
    pub async fn generate_cancellable<C>(
        &mut self,
        client: &PaperGenerationClient,
        cancel: C,
    ) -> AppResult<&GeneratedPaper>
    where
        C: Future<Output = ()>,
    {
        let precondition = self
            .require_step(WizardStep::Sections)
            .and_then(|_| {
                if self.store.state().ready_for_generation() {
                    Ok(())
                } else {
                    Err(ValidationError::PreviousStepsInvalid)
                }
            })
            .map_err(AppError::from);
        self.record(precondition)?;

        self.store.set_paper(None);
        self.surface = None;

        let submitted = client
            .submit_cancellable(self.store.state(), cancel)
            .await
            .map_err(AppError::from);
        let paper = match self.record(submitted) {
            Ok(paper) => paper,
            Err(e) => {
                warn!("⚠️ 试卷生成失败，停留在 {}: {}", self.step.label(), e);
                return Err(e);
            }
        };

        self.store.set_paper(Some(paper));
        self.step = WizardStep::SelectQuestions;
        info!("➡️ 进入步骤 {}", self.step);
        self.store
            .paper()
            .ok_or_else(|| AppError::from(ValidationError::NoGeneratedPaper))
    }

    // ========== 选题 ==========

    pub fn toggle_question(&mut self, question: &Question) -> &SelectedQuestions {
        self.store.toggle_question(question)
    }

    /// 按全局编号（从 1 开始）切换选中状态
    pub fn toggle_number(&mut self, number: usize) -> AppResult<&SelectedQuestions> {
        let question = self
            .store
            .paper()
            .ok_or(ValidationError::NoGeneratedPaper)
            .and_then(|paper| {
                paper
                    .question_at(number)
                    .cloned()
                    .ok_or(ValidationError::QuestionOutOfRange {
                        number,
                        count: paper.question_count(),
                    })
            })
            .map_err(AppError::from);
        let question = self.record(question)?;
        Ok(self.store.toggle_question(&question))
    }

    pub fn select_all(&mut self) -> AppResult<&SelectedQuestions> {
        let result = self.store.select_all().map(|_| ()).map_err(AppError::from);
        self.record(result)?;
        Ok(self.store.selected())
    }

    // ========== 渲染与导出 ==========

    /// 按当前选择重新渲染试卷表面，之前的编辑会被覆盖
    pub fn render(&mut self) -> &PaperSurface {
        let state = self.store.state();
        let surface = PaperSurface::render(&state.school_name, state.max_marks, self.store.selected());
        info!("🖨️ 已渲染试卷，共 {} 道题", self.store.selected().len());
        self.surface.insert(surface)
    }

    /// 导出 PDF，失败时步骤和表面都保持不变
    pub async fn export(&mut self, exporter: &PdfExporter, path: &Path) -> AppResult<ExportSummary> {
        let precondition = self
            .require_step(WizardStep::FinalizeExport)
            .map_err(AppError::from);
        self.record(precondition)?;

        let result = match &self.surface {
            Some(surface) => exporter
                .export_to_file(surface, path)
                .await
                .map_err(AppError::from),
            None => Err(AppError::from(ExportError::LibraryUnavailable)),
        };
        self.record(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{ApiError, EXTRACTION_FALLBACK_MESSAGE};
    use crate::models::{MarksDistribution, PaperSection, Section};
    use crate::services::pdf_extractor::tests::pdf_with_pages;

    fn filled_state() -> WizardState {
        WizardState {
            school_name: "Oak High".into(),
            max_marks: 50,
            syllabus_text: "Kinematics".into(),
            sections: vec![Section::new(
                "A",
                Default::default(),
                MarksDistribution::from([(5, 2), (10, 4)]),
            )],
            ..WizardState::default()
        }
    }

    fn paper() -> GeneratedPaper {
        GeneratedPaper {
            school_name: "Oak High".into(),
            paper_title: "Physics".into(),
            max_marks: 50,
            sections: vec![PaperSection {
                name: "A".into(),
                questions: vec![
                    Question::new("Define velocity.", "Rate of change of displacement.", 5),
                    Question::new("State Newton's second law.", "F = ma", 10),
                ],
            }],
        }
    }

    /// 跳过网络请求，直接进入选题步骤
    fn at_select_questions() -> WizardController {
        let mut controller = WizardController::with_state(filled_state());
        controller.store.set_paper(Some(paper()));
        controller.step = WizardStep::SelectQuestions;
        controller
    }

    fn unreachable_client() -> PaperGenerationClient {
        PaperGenerationClient::with_endpoint(
            "http://127.0.0.1:1/generate-paper-v2",
            Some(std::time::Duration::from_secs(5)),
        )
    }

    #[test]
    fn basic_info_requires_school_and_positive_marks() {
        let mut controller = WizardController::new();
        assert_eq!(controller.next(), Err(ValidationError::MissingSchoolName));
        assert_eq!(controller.step(), WizardStep::BasicInfo);
        assert!(controller.last_error().is_some());

        controller
            .store_mut()
            .replace(WizardPatch::default().school_name("   "));
        assert_eq!(controller.next(), Err(ValidationError::MissingSchoolName));

        controller
            .store_mut()
            .replace(WizardPatch::default().school_name("Oak High"));
        controller.store_mut().set_max_marks_input("abc");
        assert_eq!(controller.next(), Err(ValidationError::NonPositiveMaxMarks));

        controller.store_mut().set_max_marks_input("50");
        assert_eq!(controller.next(), Ok(WizardStep::Syllabus));
        assert_eq!(controller.last_error(), None);
    }

    #[test]
    fn syllabus_then_sections_needs_generation() {
        let mut controller = WizardController::with_state(WizardState {
            syllabus_text: String::new(),
            ..filled_state()
        });
        controller.next().unwrap();
        assert_eq!(controller.next(), Err(ValidationError::MissingSyllabus));

        controller
            .store_mut()
            .replace(WizardPatch::default().syllabus_text("Optics"));
        assert_eq!(controller.next(), Ok(WizardStep::Sections));
        assert_eq!(controller.next(), Err(ValidationError::GenerationRequired));
        assert_eq!(controller.step(), WizardStep::Sections);
    }

    #[test]
    fn back_is_clamped_at_first_step() {
        let mut controller = WizardController::with_state(filled_state());
        assert_eq!(controller.back(), WizardStep::BasicInfo);
        controller.next().unwrap();
        assert_eq!(controller.back(), WizardStep::BasicInfo);
    }

    #[test]
    fn select_questions_requires_a_selection_and_renders_on_advance() {
        let mut controller = at_select_questions();
        assert_eq!(controller.next(), Err(ValidationError::NoQuestionsSelected));

        controller.toggle_number(2).unwrap();
        assert_eq!(controller.next(), Ok(WizardStep::FinalizeExport));

        let surface = controller.surface().unwrap();
        assert!(surface
            .to_plain_text(60)
            .contains("Q1. State Newton's second law. (10)"));

        // 最后一步前进不做任何事，但可以后退
        assert_eq!(controller.next(), Ok(WizardStep::FinalizeExport));
        assert_eq!(controller.back(), WizardStep::SelectQuestions);
    }

    #[test]
    fn toggle_number_out_of_range_is_reported() {
        let mut controller = at_select_questions();
        assert!(controller.toggle_number(0).is_err());
        assert!(controller.toggle_number(3).is_err());
        assert!(controller.selected().is_empty());

        controller.select_all().unwrap();
        assert_eq!(controller.selected().len(), 2);
    }

    #[tokio::test]
    async fn generation_requires_valid_previous_steps() {
        let mut controller = WizardController::with_state(filled_state());
        controller.next().unwrap();
        controller.next().unwrap();
        controller
            .store_mut()
            .replace(WizardPatch::default().school_name(""));

        let err = controller.generate(&unreachable_client()).await.unwrap_err();
        assert!(matches!(
            err,
            AppError::Validation(ValidationError::PreviousStepsInvalid)
        ));
        assert_eq!(
            controller.last_error(),
            Some("Please ensure all previous steps are filled correctly.")
        );
    }

    #[tokio::test]
    async fn generation_outside_sections_is_rejected() {
        let mut controller = WizardController::with_state(filled_state());
        let err = controller.generate(&unreachable_client()).await.unwrap_err();
        assert!(matches!(
            err,
            AppError::Validation(ValidationError::WrongStep { .. })
        ));
    }

    #[tokio::test]
    async fn generation_failure_stays_at_sections() {
        let mut controller = WizardController::with_state(filled_state());
        controller.next().unwrap();
        controller.next().unwrap();
        let before = controller.state().clone();

        let err = controller.generate(&unreachable_client()).await.unwrap_err();
        assert!(matches!(err, AppError::Api(ApiError::Unreachable { .. })));
        assert_eq!(controller.step(), WizardStep::Sections);
        assert_eq!(controller.state(), &before);
        assert_eq!(
            controller.last_error(),
            Some("Failed to connect to the backend. Please ensure it is running.")
        );
    }

    #[tokio::test]
    async fn cancelled_generation_stays_at_sections() {
        let mut controller = WizardController::with_state(filled_state());
        controller.next().unwrap();
        controller.next().unwrap();

        let err = controller
            .generate_cancellable(&unreachable_client(), async {})
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Api(ApiError::Cancelled)));
        assert_eq!(controller.step(), WizardStep::Sections);
    }

    #[tokio::test]
    async fn attaching_pdf_fills_syllabus_text() {
        let mut controller = WizardController::new();
        let file = SyllabusFile::new("syllabus.pdf", pdf_with_pages(&[&["Optics", "Waves"]]));
        let state = tokio_test::assert_ok!(
            controller
                .attach_syllabus(file, &PdfTextExtractor::new())
                .await
        );
        assert_eq!(state.syllabus_text, "Optics Waves\n");
        assert_eq!(
            state.syllabus_file.as_ref().map(|f| f.file_name.as_str()),
            Some("syllabus.pdf")
        );

        let state = controller.detach_syllabus();
        assert!(state.syllabus_file.is_none());
        assert_eq!(state.syllabus_text, "Optics Waves\n");
    }

    #[tokio::test]
    async fn failed_extraction_attaches_nothing() {
        let mut controller = WizardController::with_state(WizardState {
            syllabus_text: "typed by hand".into(),
            ..WizardState::default()
        });
        let file = SyllabusFile::new("broken.pdf", b"not a pdf".to_vec());
        let err = tokio_test::assert_err!(
            controller
                .attach_syllabus(file, &PdfTextExtractor::new())
                .await
        );

        assert_eq!(err.user_message(), EXTRACTION_FALLBACK_MESSAGE);
        assert_eq!(controller.last_error(), Some(EXTRACTION_FALLBACK_MESSAGE));
        assert!(controller.state().syllabus_file.is_none());
        assert_eq!(controller.state().syllabus_text, "typed by hand");
    }

    #[tokio::test]
    async fn export_without_surface_reports_unavailable() {
        let mut controller = at_select_questions();
        controller.step = WizardStep::FinalizeExport;
        let dir = tempfile::tempdir().unwrap();

        let err = controller
            .export(&PdfExporter::new(), &dir.path().join("out.pdf"))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            AppError::Export(ExportError::LibraryUnavailable)
        ));
        assert_eq!(controller.step(), WizardStep::FinalizeExport);
    }

    #[tokio::test]
    async fn export_writes_edited_surface() {
        let mut controller = at_select_questions();
        controller.select_all().unwrap();
        controller.next().unwrap();
        controller
            .surface_mut()
            .unwrap()
            .edit_text(1, "Subject: Physics")
            .unwrap();

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("question-paper.pdf");
        let summary = controller
            .export(&PdfExporter::new(), &path)
            .await
            .unwrap();
        assert_eq!(summary.pages, 1);

        let bytes = std::fs::read(&path).unwrap();
        let text = crate::services::pdf_extractor::extract_text_from_bytes(&bytes).unwrap();
        assert!(text.contains("Subject: Physics"));
        assert!(text.contains("Q2. State Newton's second law."));
    }
}
