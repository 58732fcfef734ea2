//! Spreadsheet input and output for the monthly dashboard pipeline: the data
//! loader, PR agility exports, the month folder layout, master-data persistence, and atomic
//! workbook writes.

pub mod agility;
pub mod dates;
pub mod error;
pub mod folders;
pub mod item;
pub mod loader;
pub mod master;
pub mod table;
pub mod writer;

pub use agility::{agility_dir, merge_agility_exports};
pub use error::IoError;
pub use folders::{input_path, FolderLayout};
pub use item::ContentItem;
pub use loader::{DataLoader, LoadStats, LoadedMonth};
pub use master::{read_master_data, update_master_data, MasterUpdate};
pub use table::{read_first_sheet, read_sheet, Cell, SheetTable};
pub use writer::{sanitize_sheet_name, write_workbook_atomic, SheetData, TEMP_PREFIX};
