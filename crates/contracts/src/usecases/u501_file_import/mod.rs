pub mod progress;
pub mod request;
pub mod response;
pub mod session;
pub mod template;

pub use progress::{ImportProgress, RunState};
pub use request::{ColumnMappingRequest, ConfirmImportRequest, ImportOptions, TemplatesQuery, UploadQuery};
pub use response::{
    DeactivateResponse, ImportPreviewResponse, ImportResultDto, ImportStatusResponse, UndoResponse,
};
pub use session::{ImportSessionDto, ImportSessionStatus};
pub use template::{EntityType, ImportTemplate};

use crate::usecases::common::UseCaseMetadata;

pub struct ImportFromFile;

impl UseCaseMetadata for ImportFromFile {
    fn usecase_index() -> &'static str {
        "u501"
    }

    fn usecase_name() -> &'static str {
        "file_import"
    }

    fn display_name() -> &'static str {
        "Import from CSV/XLSX"
    }

    fn description() -> &'static str {
        "Bulk onboarding of users and contracts from uploaded spreadsheets"
    }
}
