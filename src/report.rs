use crate::context::Context;
use crate::error::CommunityError;
use crate::HashMap;
use csv::Writer;
use std::any::TypeId;
use std::cell::RefCell;
use std::ffi::OsStr;
use std::fs::{create_dir_all, File};
use std::path::Path;

pub trait Report: 'static {
    // Returns report type
    fn type_id(&self) -> TypeId;
    // Serializes the data with the correct writer
    fn serialize(&self, writer: &mut Writer<File>) -> Result<(), CommunityError>;
}

/// Use this macro to define a unique report type
#[macro_export]
macro_rules! define_report {
    ($name:ident) => {
        impl $crate::report::Report for $name {
            fn type_id(&self) -> std::any::TypeId {
                std::any::TypeId::of::<$name>()
            }

            fn serialize(
                &self,
                writer: &mut csv::Writer<std::fs::File>,
            ) -> Result<(), $crate::error::CommunityError> {
                writer.serialize(self)?;
                Ok(())
            }
        }
    };
}
pub use define_report;

struct ReportData {
    file_writers: RefCell<HashMap<TypeId, Writer<File>>>,
}

// Maps each report type to the writer for its file.
crate::context::define_data_plugin!(
    ReportPlugin,
    ReportData,
    ReportData {
        file_writers: RefCell::new(HashMap::default()),
    }
);

// Checks that the path is valid. Creates the file and all parent directories if
// they do not exist. Returns the file if successful. Called by `add_report`
fn generate_validate_filepath(path: &Path) -> Result<File, CommunityError> {
    match path.extension().and_then(OsStr::to_str) {
        Some("csv") => {
            if let Some(parent) = path.parent() {
                create_dir_all(parent)?;
            }
            let file = File::create(path)?;
            Ok(file)
        }
        _ => Err(CommunityError::ReportError(format!(
            "report output files must be CSVs, got {}",
            path.display()
        ))),
    }
}

pub trait ContextReportExt {
    /// Call `add_report` with each report type, passing the path of the CSV file the report
    /// is written to. An existing file is truncated.
    ///
    /// # Errors
    ///
    /// Returns a `CommunityError` if the path is not a `.csv` file or cannot be created.
    fn add_report<T: Report + 'static>(&mut self, file_path: &Path) -> Result<(), CommunityError>;

    /// Returns true if `add_report` has been called for `T`.
    fn has_report<T: Report + 'static>(&self) -> bool;

    /// Write a new row with columns following items in the report struct
    /// to the report file associated with the report type struct.
    ///
    /// # Errors
    ///
    /// Returns a `CommunityError` if the row cannot be serialized or written.
    ///
    /// # Panics
    ///
    /// Panics if no report of this type has been added.
    fn send_report<T: Report>(&self, report: T) -> Result<(), CommunityError>;
}

impl ContextReportExt for Context {
    fn add_report<T: Report + 'static>(&mut self, file_path: &Path) -> Result<(), CommunityError> {
        let file = generate_validate_filepath(file_path)?;

        let data_container = self.get_data_container_mut(ReportPlugin);
        let writer = Writer::from_writer(file);
        let mut file_writers = data_container.file_writers.borrow_mut();
        file_writers.insert(TypeId::of::<T>(), writer);
        Ok(())
    }

    fn has_report<T: Report + 'static>(&self) -> bool {
        self.get_data_container(ReportPlugin)
            .is_some_and(|data| data.file_writers.borrow().contains_key(&TypeId::of::<T>()))
    }

    fn send_report<T: Report>(&self, report: T) -> Result<(), CommunityError> {
        // No data container will exist if no reports have been added
        let data_container = self
            .get_data_container(ReportPlugin)
            .expect("No writer found for the report type");
        let mut writer_cell = data_container.file_writers.borrow_mut();
        let writer = writer_cell
            .get_mut(&report.type_id())
            .expect("No writer found for the report type");
        report.serialize(writer)?;
        writer.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use serde::{Deserialize, Serialize};
    use tempfile::tempdir;

    #[derive(Serialize, Deserialize)]
    struct SampleReport {
        id: u32,
        value: String,
    }

    define_report!(SampleReport);

    #[test]
    fn add_and_send_report() {
        let mut context = Context::new();
        let temp_dir = tempdir().unwrap();
        let file_path = temp_dir.path().join("sample_report.csv");
        context.add_report::<SampleReport>(&file_path).unwrap();
        assert!(context.has_report::<SampleReport>());
        context
            .send_report(SampleReport {
                id: 1,
                value: "Test Value".to_string(),
            })
            .unwrap();

        assert!(file_path.exists(), "CSV file should exist");
        let mut reader = csv::Reader::from_path(file_path).unwrap();
        let records: Vec<SampleReport> = reader.deserialize().map(Result::unwrap).collect();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].id, 1);
        assert_eq!(records[0].value, "Test Value");
    }

    #[test]
    fn directory_creation_writing_works() {
        let mut context = Context::new();
        let temp_dir = tempdir().unwrap();
        let file_path = temp_dir.path().join("test-temp").join("sample_report.csv");
        context.add_report::<SampleReport>(&file_path).unwrap();
        context
            .send_report(SampleReport {
                id: 1,
                value: "Test Value".to_string(),
            })
            .unwrap();
        assert!(file_path.exists(), "CSV file should exist");
    }

    #[test]
    fn only_csvs_allowed() {
        let temp_dir = tempdir().unwrap();
        let result = generate_validate_filepath(&temp_dir.path().join("sample_report.tsv"));
        match result {
            Err(CommunityError::ReportError(msg)) => {
                assert!(msg.starts_with("report output files must be CSVs"));
            }
            _ => panic!("Other file types beyond CSV are not allowed"),
        }
    }

    #[test]
    #[should_panic(expected = "No writer found for the report type")]
    fn send_report_without_adding_report() {
        let context = Context::new();
        assert!(!context.has_report::<SampleReport>());
        let _ = context.send_report(SampleReport {
            id: 1,
            value: "Test Value".to_string(),
        });
    }

    #[test]
    fn multiple_rows_keep_order_and_escaping() {
        let mut context = Context::new();
        let temp_dir = tempdir().unwrap();
        let file_path = temp_dir.path().join("mult_report_sample_report.csv");
        context.add_report::<SampleReport>(&file_path).unwrap();
        context
            .send_report(SampleReport {
                id: 1,
                value: "Value,1".to_string(),
            })
            .unwrap();
        context
            .send_report(SampleReport {
                id: 2,
                value: "Value\n2".to_string(),
            })
            .unwrap();

        let mut reader = csv::Reader::from_path(file_path).expect("Failed to open CSV file");
        let mut records = reader.deserialize::<SampleReport>();

        let item1: SampleReport = records
            .next()
            .expect("No record found")
            .expect("Failed to deserialize record");
        assert_eq!(item1.id, 1);
        assert_eq!(item1.value, "Value,1");

        let item2: SampleReport = records
            .next()
            .expect("No second record found")
            .expect("Failed to deserialize record");
        assert_eq!(item2.id, 2);
        assert_eq!(item2.value, "Value\n2");
    }
}
