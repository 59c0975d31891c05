//! # Dataset Persistence
//!
//! Every dataset kind decides for itself how it is read from and written to
//! disk through the [`Persist`] capability.
//!
//! - Response tables are delimited text. They are read with the `polars` CSV
//!   reader, and the response, cell line and drug columns are validated by
//!   name. They are written with the `csv` crate.
//! - Feature collections are TOML: an ordered array of entities, each with an
//!   ordered array of named views. Loading re-runs every constructor check.

use crate::error::DatasetError;
use crate::features::FeatureDataset;
use crate::response::{DrugResponseDataset, TargetType};
use ahash::AHashSet;
use ndarray::Array1;
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::Path;
use std::sync::Arc;

/// Load/save capability of a dataset kind.
pub trait Persist: Sized {
    /// Extra information needed to interpret the stored representation.
    type LoadOptions;

    fn load(path: &Path, options: &Self::LoadOptions) -> Result<Self, DatasetError>;

    fn save(&self, path: &Path) -> Result<(), DatasetError>;
}

/// Column layout of a response table.
#[derive(Debug, Clone, PartialEq)]
pub struct ResponseColumns {
    pub response: String,
    pub cell_line_id: String,
    pub drug_id: String,
    pub target_type: TargetType,
    pub separator: u8,
}

/// Optional column holding model predictions.
const PREDICTIONS_COLUMN: &str = "predictions";

impl ResponseColumns {
    /// The layout of GDSC response exports (`LN_IC50`, `CELL_LINE_NAME`, `DRUG_NAME`).
    pub fn gdsc() -> Self {
        Self {
            response: "LN_IC50".to_string(),
            cell_line_id: "CELL_LINE_NAME".to_string(),
            drug_id: "DRUG_NAME".to_string(),
            target_type: TargetType::Ic50,
            separator: b',',
        }
    }

    /// The layout written by [`DrugResponseDataset::save`].
    pub fn canonical(target_type: TargetType) -> Self {
        Self {
            response: "response".to_string(),
            cell_line_id: "cell_line_id".to_string(),
            drug_id: "drug_id".to_string(),
            target_type,
            separator: b',',
        }
    }
}

impl Default for ResponseColumns {
    fn default() -> Self {
        Self::gdsc()
    }
}

impl Persist for DrugResponseDataset {
    type LoadOptions = ResponseColumns;

    fn load(path: &Path, columns: &ResponseColumns) -> Result<Self, DatasetError> {
        log::info!("Loading drug response data from '{}'", path.display());

        // Identifiers keep their exact text ("007" must not become 7).
        let identifier_schema: Schema = [&columns.cell_line_id, &columns.drug_id]
            .into_iter()
            .map(|name| Field::new(name.as_str().into(), DataType::String))
            .collect();

        let df = CsvReader::new(File::open(path)?)
            .with_options(
                CsvReadOptions::default()
                    .with_has_header(true)
                    .with_schema_overwrite(Some(Arc::new(identifier_schema)))
                    .with_parse_options(
                        CsvParseOptions::default().with_separator(columns.separator),
                    ),
            )
            .finish()?;

        let present: AHashSet<String> = df
            .get_column_names()
            .into_iter()
            .map(|s| s.to_string())
            .collect();
        for required in [&columns.response, &columns.cell_line_id, &columns.drug_id] {
            if !present.contains(required.as_str()) {
                return Err(DatasetError::ColumnNotFound(required.clone()));
            }
        }

        let response = extract_numeric_column(&df, &columns.response)?;
        let cell_line_ids = extract_string_column(&df, &columns.cell_line_id)?;
        let drug_ids = extract_string_column(&df, &columns.drug_id)?;

        let mut dataset = DrugResponseDataset::new(
            columns.target_type,
            Array1::from_vec(response),
            cell_line_ids,
            drug_ids,
        )?;
        if present.contains(PREDICTIONS_COLUMN) {
            let predictions = extract_numeric_column(&df, PREDICTIONS_COLUMN)?;
            dataset.set_predictions(Array1::from_vec(predictions))?;
        }

        log::info!(
            "Loaded {} {} response records",
            dataset.len(),
            dataset.target_type()
        );
        Ok(dataset)
    }

    /// Writes the dataset in the [`ResponseColumns::canonical`] layout, with a
    /// `predictions` column when predictions are set.
    fn save(&self, path: &Path) -> Result<(), DatasetError> {
        let mut writer = csv::Writer::from_path(path)?;
        let columns = ResponseColumns::canonical(self.target_type());

        let mut header = vec![
            columns.cell_line_id.as_str(),
            columns.drug_id.as_str(),
            columns.response.as_str(),
        ];
        if self.predictions().is_some() {
            header.push(PREDICTIONS_COLUMN);
        }
        writer.write_record(&header)?;

        for i in 0..self.len() {
            let mut record = vec![
                self.cell_line_ids()[i].clone(),
                self.drug_ids()[i].clone(),
                self.response()[i].to_string(),
            ];
            if let Some(predictions) = self.predictions() {
                record.push(predictions[i].to_string());
            }
            writer.write_record(&record)?;
        }
        writer.flush()?;

        log::info!("Saved {} response records to '{}'", self.len(), path.display());
        Ok(())
    }
}

impl DrugResponseDataset {
    /// Loads a GDSC response export stored at `<path_data>/<dataset_name>/<file_name>`.
    pub fn load_gdsc(
        path_data: &Path,
        dataset_name: &str,
        file_name: &str,
    ) -> Result<Self, DatasetError> {
        let path = path_data.join(dataset_name).join(file_name);
        Self::load(&path, &ResponseColumns::gdsc())
    }
}

#[derive(Serialize, Deserialize)]
struct FeatureFile {
    entities: Vec<EntityRecord>,
}

#[derive(Serialize, Deserialize)]
struct EntityRecord {
    id: String,
    views: Vec<ViewRecord>,
}

#[derive(Serialize, Deserialize)]
struct ViewRecord {
    name: String,
    values: Vec<f64>,
}

impl Persist for FeatureDataset {
    type LoadOptions = ();

    fn load(path: &Path, _: &()) -> Result<Self, DatasetError> {
        let contents = fs::read_to_string(path)?;
        let file: FeatureFile = toml::from_str(&contents)?;
        let dataset = FeatureDataset::new(file.entities.into_iter().map(|entity| {
            let views = entity
                .views
                .into_iter()
                .map(|view| (view.name, Array1::from_vec(view.values)))
                .collect::<Vec<_>>();
            (entity.id, views)
        }))?;

        log::info!(
            "Loaded {} entities with views {:?} from '{}'",
            dataset.len(),
            dataset.get_view_names(),
            path.display()
        );
        Ok(dataset)
    }

    fn save(&self, path: &Path) -> Result<(), DatasetError> {
        let mut entities = Vec::with_capacity(self.len());
        for id in self.get_ids() {
            let mut views = Vec::with_capacity(self.get_view_names().len());
            for name in self.get_view_names() {
                views.push(ViewRecord {
                    name: name.clone(),
                    values: self.get_feature_vector(id, name)?.to_vec(),
                });
            }
            entities.push(EntityRecord {
                id: id.clone(),
                views,
            });
        }

        let toml_string = toml::to_string_pretty(&FeatureFile { entities })?;
        let mut file = BufWriter::new(File::create(path)?);
        file.write_all(toml_string.as_bytes())?;
        file.flush()?;
        Ok(())
    }
}

fn extract_numeric_column(df: &DataFrame, column_name: &str) -> Result<Vec<f64>, DatasetError> {
    let series = df.column(column_name)?;
    if series.null_count() > 0 {
        return Err(DatasetError::MissingValuesFound(column_name.to_string()));
    }

    let wrong_type = || DatasetError::ColumnWrongType {
        column_name: column_name.to_string(),
        expected_type: "f64 (numeric)",
        found_type: format!("{:?}", series.dtype()),
    };
    let casted = series.cast(&DataType::Float64).map_err(|_| wrong_type())?;
    if casted.null_count() > 0 {
        return Err(wrong_type());
    }

    let values: Vec<f64> = casted.f64()?.rechunk().into_no_null_iter().collect();
    if values.iter().any(|v| !v.is_finite()) {
        return Err(DatasetError::NonFinite(column_name.to_string()));
    }
    Ok(values)
}

fn extract_string_column(df: &DataFrame, column_name: &str) -> Result<Vec<String>, DatasetError> {
    let series = df.column(column_name)?;
    if series.null_count() > 0 {
        return Err(DatasetError::MissingValuesFound(column_name.to_string()));
    }

    let casted = series.cast(&DataType::String)?;
    casted
        .str()?
        .into_iter()
        .map(|value| value.map(str::to_string))
        .collect::<Option<Vec<String>>>()
        .ok_or_else(|| DatasetError::MissingValuesFound(column_name.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::tests::dataset_from;
    use approx::assert_abs_diff_eq;
    use ndarray::array;
    use std::io::{self, Write};
    use tempfile::{NamedTempFile, tempdir};

    fn create_test_csv(content: &str) -> io::Result<NamedTempFile> {
        let mut file = NamedTempFile::new()?;
        writeln!(file, "{}", content)?;
        file.flush()?;
        Ok(file)
    }

    #[test]
    fn test_load_gdsc_layout() {
        let dir = tempdir().unwrap();
        let dataset_dir = dir.path().join("GDSC1");
        fs::create_dir_all(&dataset_dir).unwrap();
        fs::write(
            dataset_dir.join("response_GDSC1.csv"),
            "DATASET,CELL_LINE_NAME,DRUG_NAME,LN_IC50,AUC\n\
             GDSC1,MC-CAR,Erlotinib,2.453,0.98\n\
             GDSC1,ES3,Rapamycin,-2.78,0.72\n\
             GDSC1,MC-CAR,Rapamycin,-1.5,0.81\n",
        )
        .unwrap();

        let dataset = DrugResponseDataset::load_gdsc(dir.path(), "GDSC1", "response_GDSC1.csv")
            .unwrap();
        assert_eq!(dataset.len(), 3);
        assert_eq!(dataset.target_type(), TargetType::Ic50);
        assert_eq!(dataset.cell_line_ids(), &["MC-CAR", "ES3", "MC-CAR"]);
        assert_eq!(dataset.drug_ids(), &["Erlotinib", "Rapamycin", "Rapamycin"]);
        assert_abs_diff_eq!(dataset.response()[0], 2.453, epsilon = 1e-12);
        assert_abs_diff_eq!(dataset.response()[1], -2.78, epsilon = 1e-12);
        assert!(dataset.predictions().is_none());
    }

    #[test]
    fn test_numeric_identifiers_are_read_as_text() {
        let file = create_test_csv("cosmic_id\tdrug\tauc\n906826\t1003\t0.5\n687983\t1003\t0.7").unwrap();
        let columns = ResponseColumns {
            response: "auc".to_string(),
            cell_line_id: "cosmic_id".to_string(),
            drug_id: "drug".to_string(),
            target_type: TargetType::Auc,
            separator: b'\t',
        };
        let dataset = DrugResponseDataset::load(file.path(), &columns).unwrap();
        assert_eq!(dataset.cell_line_ids(), &["906826", "687983"]);
        assert_eq!(dataset.drug_ids(), &["1003", "1003"]);
        assert_eq!(dataset.target_type(), TargetType::Auc);
    }

    #[test]
    fn test_identifier_text_survives_round_trip() {
        let dataset = DrugResponseDataset::new(
            TargetType::Ic50,
            array![1.0, 2.0],
            vec!["007".into(), "0123".into()],
            vec!["1.50".into(), "2.0".into()],
        )
        .unwrap();

        let file = NamedTempFile::new().unwrap();
        dataset.save(file.path()).unwrap();
        let loaded =
            DrugResponseDataset::load(file.path(), &ResponseColumns::canonical(TargetType::Ic50))
                .unwrap();
        assert_eq!(loaded.cell_line_ids(), &["007", "0123"]);
        assert_eq!(loaded.drug_ids(), &["1.50", "2.0"]);

        let features = dataset_from(vec![
            ("007", vec![("expression", array![0.5])]),
            ("0123", vec![("expression", array![1.5])]),
        ]);
        let matrix = features
            .get_feature_matrix("expression", loaded.cell_line_ids())
            .unwrap();
        assert_eq!(matrix, array![[0.5], [1.5]]);
    }

    #[test]
    fn test_response_round_trip_with_predictions() {
        let mut dataset = DrugResponseDataset::new(
            TargetType::Ec50,
            array![0.125, -3.5, 7.0],
            vec!["A".into(), "B".into(), "C".into()],
            vec!["X".into(), "X".into(), "Y".into()],
        )
        .unwrap();
        dataset.set_predictions(array![0.1, -3.0, 6.5]).unwrap();

        let file = NamedTempFile::new().unwrap();
        dataset.save(file.path()).unwrap();
        let loaded =
            DrugResponseDataset::load(file.path(), &ResponseColumns::canonical(TargetType::Ec50))
                .unwrap();
        assert_eq!(loaded, dataset);
    }

    #[test]
    fn test_error_column_not_found() {
        let file = create_test_csv("CELL_LINE_NAME,DRUG_NAME,AUC\nA,X,0.5").unwrap();
        match DrugResponseDataset::load(file.path(), &ResponseColumns::gdsc()) {
            Err(DatasetError::ColumnNotFound(col)) => assert_eq!(col, "LN_IC50"),
            other => panic!("Expected ColumnNotFound, got {other:?}"),
        }
    }

    #[test]
    fn test_error_missing_values() {
        let file = create_test_csv("CELL_LINE_NAME,DRUG_NAME,LN_IC50\nA,X,0.5\nB,X,\nC,Y,1.0").unwrap();
        match DrugResponseDataset::load(file.path(), &ResponseColumns::gdsc()) {
            Err(DatasetError::MissingValuesFound(col)) => assert_eq!(col, "LN_IC50"),
            other => panic!("Expected MissingValuesFound, got {other:?}"),
        }
    }

    #[test]
    fn test_error_wrong_type() {
        let file =
            create_test_csv("CELL_LINE_NAME,DRUG_NAME,LN_IC50\nA,X,0.5\nB,X,not_a_number").unwrap();
        match DrugResponseDataset::load(file.path(), &ResponseColumns::gdsc()) {
            Err(DatasetError::ColumnWrongType {
                column_name,
                expected_type,
                ..
            }) => {
                assert_eq!(column_name, "LN_IC50");
                assert_eq!(expected_type, "f64 (numeric)");
            }
            other => panic!("Expected ColumnWrongType, got {other:?}"),
        }
    }

    #[test]
    fn test_feature_round_trip_keeps_order() {
        let dataset = dataset_from(vec![
            ("zeta", vec![("fingerprints", array![1.0, 0.0]), ("targets", array![0.25])]),
            ("alpha", vec![("fingerprints", array![0.0, 1.0]), ("targets", array![-4.5])]),
        ]);
        let file = NamedTempFile::new().unwrap();
        dataset.save(file.path()).unwrap();

        let loaded = FeatureDataset::load(file.path(), &()).unwrap();
        assert_eq!(loaded, dataset);
        assert_eq!(loaded.get_ids(), &["zeta", "alpha"]);
        assert_eq!(loaded.get_view_names(), &["fingerprints", "targets"]);
    }

    #[test]
    fn test_feature_load_validates_schema() {
        let file = create_test_csv(
            "[[entities]]\nid = \"a\"\n[[entities.views]]\nname = \"x\"\nvalues = [1.0, 2.0]\n\
             [[entities]]\nid = \"b\"\n[[entities.views]]\nname = \"y\"\nvalues = [1.0, 2.0]",
        )
        .unwrap();
        assert!(matches!(
            FeatureDataset::load(file.path(), &()),
            Err(DatasetError::SchemaMismatch(_))
        ));
    }
}
