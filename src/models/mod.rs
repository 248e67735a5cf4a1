pub mod difficulty;
pub mod loaders;
pub mod paper;
pub mod selection;
pub mod wizard_state;

pub use difficulty::Difficulty;
pub use loaders::{load_draft, WizardDraft};
pub use paper::{GeneratedPaper, PaperSection, Question};
pub use selection::SelectedQuestions;
pub use wizard_state::{
    BudgetStatus, MarksBudget, MarksDistribution, Section, SectionPatch, SyllabusFile,
    WizardPatch, WizardState,
};
