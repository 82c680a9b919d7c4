//! In-memory tabular data and treatment-group partitioning
//!
//! A [`Dataset`] is an ordered list of rows, each mapping a column name to a
//! scalar [`Value`]. Rows are never mutated while a table is generated.

use crate::error::{BalanceError, Result};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap};
use std::fmt;

/// A single cell value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    Number(f64),
    Text(String),
    /// Absent or null cell (`null` in JSON)
    Missing,
}

impl Value {
    pub fn is_missing(&self) -> bool {
        matches!(self, Value::Missing)
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(*n),
            _ => None,
        }
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Number(n)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Number(n as f64)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Text(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Text(s)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map_or(Value::Missing, Into::into)
    }
}

/// One row of the dataset
pub type Record = HashMap<String, Value>;

/// Ordered collection of records
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Dataset {
    rows: Vec<Record>,
}

impl Dataset {
    pub fn new(rows: Vec<Record>) -> Self {
        Self { rows }
    }

    /// Build a dataset from a JSON array of objects (`null` cells become [`Value::Missing`])
    pub fn from_json_str(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn rows(&self) -> &[Record] {
        &self.rows
    }

    /// Whether any row carries the column
    pub fn has_column(&self, column: &str) -> bool {
        self.rows.iter().any(|row| row.contains_key(column))
    }

    /// Read a numeric column, one entry per row (`None` for missing cells)
    ///
    /// Fails with `MissingCovariate` when no row has the column and with
    /// `NonNumericValue` when a cell holds text.
    pub fn numeric_column(&self, column: &str) -> Result<Vec<Option<f64>>> {
        if !self.has_column(column) {
            return Err(BalanceError::MissingCovariate(column.to_string()));
        }

        self.rows
            .iter()
            .enumerate()
            .map(|(row, record)| match record.get(column) {
                None | Some(Value::Missing) => Ok(None),
                Some(Value::Number(n)) if n.is_nan() => Ok(None),
                Some(Value::Number(n)) => Ok(Some(*n)),
                Some(Value::Text(_)) => Err(BalanceError::NonNumericValue {
                    column: column.to_string(),
                    row,
                }),
            })
            .collect()
    }

    /// Non-missing values of a numeric column
    pub fn present_values(&self, column: &str) -> Result<Vec<f64>> {
        Ok(self.numeric_column(column)?.into_iter().flatten().collect())
    }

    /// Partition rows by the treatment key, groups in natural key order
    pub fn partition(&self, key: &TreatmentKey) -> Result<Vec<Group>> {
        for column in key.columns() {
            if !self.has_column(column) {
                return Err(BalanceError::MissingTreatmentColumn(column.clone()));
            }
        }

        let mut groups: BTreeMap<GroupKey, Vec<usize>> = BTreeMap::new();
        for (row, record) in self.rows.iter().enumerate() {
            let parts = key
                .columns()
                .iter()
                .map(|column| match record.get(column) {
                    Some(Value::Number(n)) if !n.is_nan() => Ok(KeyPart::number(*n)),
                    Some(Value::Text(s)) => Ok(KeyPart::Text(s.clone())),
                    _ => Err(BalanceError::MissingTreatmentValue {
                        column: column.clone(),
                        row,
                    }),
                })
                .collect::<Result<Vec<_>>>()?;
            groups.entry(GroupKey(parts)).or_default().push(row);
        }

        tracing::debug!(
            "partitioned {} rows into {} groups by {:?}",
            self.rows.len(),
            groups.len(),
            key.columns()
        );

        Ok(groups
            .into_iter()
            .map(|(key, rows)| Group { key, rows })
            .collect())
    }
}

impl FromIterator<Record> for Dataset {
    fn from_iter<I: IntoIterator<Item = Record>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

/// Column(s) identifying treatment group membership
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TreatmentKey {
    Single(String),
    Composite(Vec<String>),
}

impl TreatmentKey {
    pub fn single(column: impl Into<String>) -> Self {
        TreatmentKey::Single(column.into())
    }

    pub fn composite<I, S>(columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        TreatmentKey::Composite(columns.into_iter().map(Into::into).collect())
    }

    pub fn columns(&self) -> &[String] {
        match self {
            TreatmentKey::Single(column) => std::slice::from_ref(column),
            TreatmentKey::Composite(columns) => columns,
        }
    }

    pub fn is_composite(&self) -> bool {
        matches!(self, TreatmentKey::Composite(_))
    }
}

/// One component of a group key
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum KeyPart {
    Number(f64),
    Text(String),
}

impl KeyPart {
    /// Numeric key part; `-0.0` is stored as `0.0` so both land in one group
    pub fn number(n: f64) -> Self {
        KeyPart::Number(n + 0.0)
    }
}

impl PartialEq for KeyPart {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for KeyPart {}

impl PartialOrd for KeyPart {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

// Numbers sort before text; numbers by value (signed zeros equal), text
// lexicographically.
impl Ord for KeyPart {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (KeyPart::Number(a), KeyPart::Number(b)) => (a + 0.0).total_cmp(&(b + 0.0)),
            (KeyPart::Number(_), KeyPart::Text(_)) => Ordering::Less,
            (KeyPart::Text(_), KeyPart::Number(_)) => Ordering::Greater,
            (KeyPart::Text(a), KeyPart::Text(b)) => a.cmp(b),
        }
    }
}

impl fmt::Display for KeyPart {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KeyPart::Number(n) => write!(f, "{}", n),
            KeyPart::Text(s) => f.write_str(s),
        }
    }
}

/// Distinct value tuple of the treatment key columns
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GroupKey(pub Vec<KeyPart>);

impl GroupKey {
    pub fn parts(&self) -> &[KeyPart] {
        &self.0
    }

    /// Each component rendered as text
    pub fn components(&self) -> Vec<String> {
        self.0.iter().map(ToString::to_string).collect()
    }
}

impl fmt::Display for GroupKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.components().join(", "))
    }
}

/// Rows belonging to one treatment group
#[derive(Debug, Clone, PartialEq)]
pub struct Group {
    pub key: GroupKey,
    /// Row indices into the dataset, in dataset order
    pub rows: Vec<usize>,
}

impl Group {
    pub fn size(&self) -> usize {
        self.rows.len()
    }

    /// Non-missing values of `column` within this group
    pub fn values(&self, column: &[Option<f64>]) -> Vec<f64> {
        self.rows.iter().filter_map(|&row| column[row]).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(pairs: &[(&str, Value)]) -> Record {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    fn sample() -> Dataset {
        Dataset::new(vec![
            record(&[("arm", "treated".into()), ("age", 30.0.into())]),
            record(&[("arm", "control".into()), ("age", 40.0.into())]),
            record(&[("arm", "treated".into()), ("age", Value::Missing)]),
            record(&[("arm", "control".into()), ("age", 50.0.into())]),
        ])
    }

    #[test]
    fn test_partition_sorted_by_key() {
        let groups = sample().partition(&TreatmentKey::single("arm")).unwrap();
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].key.to_string(), "control");
        assert_eq!(groups[1].key.to_string(), "treated");
        assert_eq!(groups[0].rows, vec![1, 3]);
        assert_eq!(groups[1].rows, vec![0, 2]);
    }

    #[test]
    fn test_numeric_keys_sort_by_value() {
        let data = Dataset::new(vec![
            record(&[("wave", 10.0.into())]),
            record(&[("wave", 9.0.into())]),
            record(&[("wave", "late".into())]),
        ]);
        let groups = data.partition(&TreatmentKey::single("wave")).unwrap();
        let labels: Vec<String> = groups.iter().map(|g| g.key.to_string()).collect();
        assert_eq!(labels, vec!["9", "10", "late"]);
    }

    #[test]
    fn test_signed_zero_keys_share_a_group() {
        let data = Dataset::new(vec![
            record(&[("dose", 0.0.into())]),
            record(&[("dose", 0.0.into())]),
            record(&[("dose", (-0.0).into())]),
            record(&[("dose", (-0.0).into())]),
            record(&[("dose", 1.0.into())]),
            record(&[("dose", 1.0.into())]),
        ]);
        let groups = data.partition(&TreatmentKey::single("dose")).unwrap();
        let labels: Vec<String> = groups.iter().map(|g| g.key.to_string()).collect();
        assert_eq!(labels, vec!["0", "1"]);
        assert_eq!(groups[0].rows, vec![0, 1, 2, 3]);
        assert_eq!(KeyPart::Number(-0.0), KeyPart::Number(0.0));
    }

    #[test]
    fn test_partition_missing_treatment_value() {
        let mut data = sample();
        data.rows[2].insert("arm".to_string(), Value::Missing);
        let err = data.partition(&TreatmentKey::single("arm")).unwrap_err();
        assert_eq!(
            err,
            BalanceError::MissingTreatmentValue {
                column: "arm".to_string(),
                row: 2
            }
        );
    }

    #[test]
    fn test_partition_unknown_column() {
        let err = sample()
            .partition(&TreatmentKey::single("cohort"))
            .unwrap_err();
        assert_eq!(err, BalanceError::MissingTreatmentColumn("cohort".to_string()));
    }

    #[test]
    fn test_numeric_column_missing_and_text() {
        let data = sample();
        assert_eq!(
            data.numeric_column("age").unwrap(),
            vec![Some(30.0), Some(40.0), None, Some(50.0)]
        );
        assert_eq!(
            data.numeric_column("arm").unwrap_err(),
            BalanceError::NonNumericValue {
                column: "arm".to_string(),
                row: 0
            }
        );
        assert_eq!(
            data.numeric_column("height").unwrap_err(),
            BalanceError::MissingCovariate("height".to_string())
        );
    }

    #[test]
    fn test_group_values_skip_missing() {
        let data = sample();
        let column = data.numeric_column("age").unwrap();
        let groups = data.partition(&TreatmentKey::single("arm")).unwrap();
        assert_eq!(groups[1].values(&column), vec![30.0]);
        assert_eq!(groups[1].size(), 2);
    }

    #[test]
    fn test_composite_key_partition() {
        let data = Dataset::new(vec![
            record(&[("r1", "High".into()), ("r2", "Low".into())]),
            record(&[("r1", "High".into()), ("r2", "High".into())]),
            record(&[("r1", "High".into()), ("r2", "Low".into())]),
        ]);
        let groups = data
            .partition(&TreatmentKey::composite(["r1", "r2"]))
            .unwrap();
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].key.components(), vec!["High", "High"]);
        assert_eq!(groups[1].key.components(), vec!["High", "Low"]);
        assert_eq!(groups[1].size(), 2);
    }

    #[test]
    fn test_dataset_from_json() {
        let data = Dataset::from_json_str(
            r#"[{"arm": "a", "x": 1.5}, {"arm": "b", "x": null}]"#,
        )
        .unwrap();
        assert_eq!(data.len(), 2);
        assert_eq!(data.numeric_column("x").unwrap(), vec![Some(1.5), None]);
    }
}
