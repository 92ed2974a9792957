// src/export.rs

use anyhow::{Context, Result};
use arrow::array::{ArrayRef, Float64Builder, StringBuilder};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use parquet::arrow::ArrowWriter;
use parquet::basic::Compression;
use parquet::file::properties::WriterProperties;
use std::{collections::HashMap, fs::File, path::Path, sync::Arc};
use tracing::info;

use crate::process::StatsTable;

/// Arrow schema for a table: `id`, `name`, then one Float64 per column label.
///
/// Value fields carry their source codes as metadata (`time_code`,
/// `category_code`) plus the category's `unit` when the payload has one.
pub fn arrow_schema(table: &StatsTable) -> Schema {
    let mut fields = vec![
        Field::new("id", DataType::Utf8, false),
        Field::new("name", DataType::Utf8, false),
    ];
    fields.extend(table.schema().iter().zip(table.columns()).map(
        |(label, (time, category))| {
            let mut meta = HashMap::from([
                ("time_code".to_string(), time.code.clone()),
                ("category_code".to_string(), category.code.clone()),
            ]);
            if let Some(unit) = &category.unit {
                meta.insert("unit".to_string(), unit.clone());
            }
            Field::new(label, DataType::Float64, false).with_metadata(meta)
        },
    ));
    Schema::new(fields)
}

/// Collect every emitted record into one batch.
pub fn to_record_batch(table: &StatsTable) -> Result<RecordBatch> {
    let width = table.schema().len();
    let mut ids = StringBuilder::new();
    let mut names = StringBuilder::new();
    let mut columns: Vec<Float64Builder> = (0..width).map(|_| Float64Builder::new()).collect();

    for record in table.records() {
        ids.append_value(&record.id);
        names.append_value(&record.name);
        for (col, value) in columns.iter_mut().zip(record.values) {
            col.append_value(value);
        }
    }

    let mut arrays: Vec<ArrayRef> = vec![Arc::new(ids.finish()), Arc::new(names.finish())];
    arrays.extend(
        columns
            .iter_mut()
            .map(|b| Arc::new(b.finish()) as ArrayRef),
    );

    RecordBatch::try_new(Arc::new(arrow_schema(table)), arrays).context("building table batch")
}

/// Write the table to a Snappy-compressed Parquet file. Returns rows written.
pub fn write_parquet<P: AsRef<Path>>(table: &StatsTable, path: P) -> Result<usize> {
    let path = path.as_ref();
    let batch = to_record_batch(table)?;

    let file = File::create(path).with_context(|| format!("creating {:?}", path))?;
    let props = WriterProperties::builder()
        .set_compression(Compression::SNAPPY)
        .build();
    let mut writer = ArrowWriter::try_new(file, batch.schema(), Some(props))
        .context("creating Arrow writer")?;
    writer.write(&batch).context("writing table batch")?;
    writer.close().context("closing Parquet writer")?;

    info!(path = %path.display(), rows = batch.num_rows(), "wrote parquet");
    Ok(batch.num_rows())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PipelineOptions;
    use crate::process::test_support::payload;
    use arrow::array::{Float64Array, StringArray};
    use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
    use tempfile::tempdir;

    fn sample() -> StatsTable {
        sample_with(|_| ())
    }

    /// `tweak` may edit the raw JSON before it is reshaped.
    fn sample_with(tweak: impl FnOnce(&mut serde_json::Value)) -> StatsTable {
        let bytes = payload(
            &["2020"],
            &["P", "H"],
            &[
                ("01000", "北海道", 2, None),
                ("13000", "東京都", 2, None),
                ("27000", "大阪府", 2, None),
            ],
            &[
                ("2020", "01000", "P", "5224614"),
                ("2020", "01000", "H", "2476846"),
                ("2020", "13000", "P", "14047594"),
                ("2020", "13000", "H", "7227180"),
                ("2020", "27000", "P", "8837685"),
            ],
        );
        let mut raw: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        tweak(&mut raw);
        let bytes = raw.to_string().into_bytes();
        let opts = PipelineOptions {
            skip_incomplete_columns: false,
            ..PipelineOptions::default()
        };
        StatsTable::from_slice(&bytes, &opts).unwrap()
    }

    #[test]
    fn batch_has_one_column_per_label() -> Result<()> {
        let batch = to_record_batch(&sample())?;
        let names: Vec<String> = batch
            .schema()
            .fields()
            .iter()
            .map(|f| f.name().clone())
            .collect();
        assert_eq!(names, vec!["id", "name", "2020_P", "2020_H"]);
        // Osaka has a gap and is dropped
        assert_eq!(batch.num_rows(), 2);
        Ok(())
    }

    #[test]
    fn value_fields_carry_codes_and_unit() {
        let table = sample_with(|raw| {
            raw["GET_STATS_DATA"]["STATISTICAL_DATA"]["CLASS_INF"]["CLASS_OBJ"][1]["CLASS"][0]
                ["@unit"] = "人".into();
        });
        let schema = arrow_schema(&table);

        let pop = schema.field_with_name("2020_P").unwrap().metadata();
        assert_eq!(pop.get("unit").map(String::as_str), Some("人"));
        assert_eq!(pop.get("time_code").map(String::as_str), Some("2020"));
        assert_eq!(pop.get("category_code").map(String::as_str), Some("P"));

        let households = schema.field_with_name("2020_H").unwrap().metadata();
        assert!(!households.contains_key("unit"));
        assert!(schema.field_with_name("id").unwrap().metadata().is_empty());
    }

    #[test]
    fn parquet_round_trip() -> Result<()> {
        let tmp = tempdir()?;
        let path = tmp.path().join("table.parquet");
        let rows = write_parquet(&sample(), &path)?;
        assert_eq!(rows, 2);

        let reader = ParquetRecordBatchReaderBuilder::try_new(File::open(&path)?)?.build()?;
        let batches: Vec<RecordBatch> = reader.collect::<std::result::Result<_, _>>()?;
        assert_eq!(batches.iter().map(|b| b.num_rows()).sum::<usize>(), 2);

        let batch = &batches[0];
        let ids = batch
            .column(0)
            .as_any()
            .downcast_ref::<StringArray>()
            .unwrap();
        assert_eq!(ids.value(0), "01000");
        assert_eq!(ids.value(1), "13000");
        let pop = batch
            .column(2)
            .as_any()
            .downcast_ref::<Float64Array>()
            .unwrap();
        assert_eq!(pop.value(1), 14047594.0);
        Ok(())
    }
}
