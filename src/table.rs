use ordered_float::OrderedFloat;
use thiserror::Error;

/// A borrowed single-feature regression table.
///
/// Rows are addressed through `row_index`, so subsets and reorderings share the
/// underlying columns.
#[derive(Debug, Clone)]
pub struct Table<'a> {
    row_index: Vec<usize>,
    feature: &'a [f64],
    target: &'a [f64],
}

impl<'a> Table<'a> {
    pub fn new(feature: &'a [f64], target: &'a [f64]) -> Result<Self, TableError> {
        if feature.is_empty() {
            return Err(TableError::EmptyTable);
        }

        if feature.len() != target.len() {
            return Err(TableError::RowSizeMismatch);
        }

        if feature.iter().any(|x| !x.is_finite()) {
            return Err(TableError::NonFiniteFeature);
        }

        if target.iter().any(|t| !t.is_finite()) {
            return Err(TableError::NonFiniteTarget);
        }

        Ok(Self {
            row_index: (0..feature.len()).collect(),
            feature,
            target,
        })
    }

    pub fn feature(&self) -> impl '_ + Iterator<Item = f64> + Clone {
        self.row_index.iter().map(move |&i| self.feature[i])
    }

    pub fn target(&self) -> impl '_ + Iterator<Item = f64> + Clone {
        self.row_index.iter().map(move |&i| self.target[i])
    }

    pub fn rows(&self) -> impl '_ + Iterator<Item = (f64, f64)> + Clone {
        self.row_index
            .iter()
            .map(move |&i| (self.feature[i], self.target[i]))
    }

    pub fn rows_len(&self) -> usize {
        self.row_index.len()
    }

    /// Stable sort: rows with equal feature values keep their relative order.
    pub fn sort_rows_by_feature(&mut self) {
        let feature = self.feature;
        self.row_index.sort_by_key(|&i| OrderedFloat(feature[i]));
    }

    /// Returns the rows at `positions` (relative to this table), in that order.
    pub fn select(&self, positions: &[usize]) -> Self {
        let row_index = positions.iter().map(|&p| self.row_index[p]).collect();
        Self {
            row_index,
            feature: self.feature,
            target: self.target,
        }
    }

    /// Returns every row except those at `positions`, keeping table order.
    pub fn exclude(&self, positions: &[usize]) -> Self {
        let mut excluded = vec![false; self.row_index.len()];
        for &p in positions {
            excluded[p] = true;
        }
        let row_index = self
            .row_index
            .iter()
            .zip(excluded)
            .filter(|(_, excluded)| !excluded)
            .map(|(&i, _)| i)
            .collect();
        Self {
            row_index,
            feature: self.feature,
            target: self.target,
        }
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TableError {
    #[error("table must have at least one row")]
    EmptyTable,

    #[error("feature and target columns have different row counts")]
    RowSizeMismatch,

    #[error("feature column contains non finite numbers")]
    NonFiniteFeature,

    #[error("target column contains non finite numbers")]
    NonFiniteTarget,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_validates_columns() {
        assert_eq!(Table::new(&[], &[]).err(), Some(TableError::EmptyTable));
        assert_eq!(
            Table::new(&[1.0, 2.0], &[1.0]).err(),
            Some(TableError::RowSizeMismatch)
        );
        assert_eq!(
            Table::new(&[f64::NAN], &[1.0]).err(),
            Some(TableError::NonFiniteFeature)
        );
        assert_eq!(
            Table::new(&[1.0], &[f64::INFINITY]).err(),
            Some(TableError::NonFiniteTarget)
        );
    }

    #[test]
    fn sort_is_stable() -> Result<(), anyhow::Error> {
        let feature = [3.0, 1.0, 2.0, 1.0];
        let target = [30.0, 10.0, 20.0, 11.0];
        let mut table = Table::new(&feature, &target)?;
        table.sort_rows_by_feature();
        assert_eq!(table.feature().collect::<Vec<_>>(), [1.0, 1.0, 2.0, 3.0]);
        assert_eq!(table.target().collect::<Vec<_>>(), [10.0, 11.0, 20.0, 30.0]);
        Ok(())
    }

    #[test]
    fn select_and_exclude_are_complementary() -> Result<(), anyhow::Error> {
        let feature = [0.0, 1.0, 2.0, 3.0, 4.0];
        let target = [5.0, 6.0, 7.0, 8.0, 9.0];
        let table = Table::new(&feature, &target)?;

        let held_out = table.select(&[3, 0]);
        assert_eq!(held_out.rows().collect::<Vec<_>>(), [(3.0, 8.0), (0.0, 5.0)]);

        let rest = table.exclude(&[3, 0]);
        assert_eq!(rest.feature().collect::<Vec<_>>(), [1.0, 2.0, 4.0]);
        assert_eq!(rest.rows_len() + held_out.rows_len(), table.rows_len());

        // Positions are relative to the table they are applied to.
        assert_eq!(rest.select(&[2]).rows().next(), Some((4.0, 9.0)));
        Ok(())
    }
}
