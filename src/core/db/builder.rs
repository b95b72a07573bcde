/// Statement Builder Module
///
/// Pure functions that render SELECT/INSERT/UPDATE statements from structured
/// input. Every data value is bound through a `?` placeholder; only table and
/// column identifiers are spliced into the statement text, and those are
/// trusted as caller-controlled.
///
/// Builders never touch a session. The only error they raise is
/// `BridgeError::Contract`, for malformed input shapes.

use crate::core::{BridgeError, Result, SqlValue};

/// A rendered statement ready for execution.
#[derive(Debug, Clone, PartialEq)]
pub struct Statement {
    /// Target relation; used to label unlabeled result sets
    pub table: String,
    pub sql: String,
    /// Bound values, in placeholder order
    pub params: Vec<SqlValue>,
    /// Number of `?` markers the builder emitted
    placeholders: usize,
}

impl Statement {
    fn new(table: &str, sql: String, placeholders: usize, params: Vec<SqlValue>) -> Self {
        Statement {
            table: table.to_string(),
            sql,
            params,
            placeholders,
        }
    }

    /// Placeholders emitted while rendering; identifiers are not scanned.
    pub fn placeholder_count(&self) -> usize {
        self.placeholders
    }

    /// Whether every placeholder has exactly one bound value.
    pub fn is_balanced(&self) -> bool {
        self.placeholder_count() == self.params.len()
    }
}

/// An ordered list of filter values.
///
/// A bare scalar converts into a one-element list, so single- and
/// multi-value filters go through the same code path.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FilterValues(Vec<SqlValue>);

impl FilterValues {
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_slice(&self) -> &[SqlValue] {
        &self.0
    }

    pub fn into_vec(self) -> Vec<SqlValue> {
        self.0
    }
}

macro_rules! impl_scalar_filter {
    ($($t:ty),*) => {
        $(impl From<$t> for FilterValues {
            fn from(value: $t) -> Self {
                FilterValues(vec![SqlValue::from(value)])
            }
        })*
    };
}

impl_scalar_filter!(SqlValue, i32, i64, u32, f64, bool, &str, String);

impl<T: Into<SqlValue>> From<Vec<T>> for FilterValues {
    fn from(values: Vec<T>) -> Self {
        FilterValues(values.into_iter().map(Into::into).collect())
    }
}

impl<T: Into<SqlValue> + Clone> From<&[T]> for FilterValues {
    fn from(values: &[T]) -> Self {
        FilterValues(values.iter().cloned().map(Into::into).collect())
    }
}

impl<T: Into<SqlValue>, const N: usize> From<[T; N]> for FilterValues {
    fn from(values: [T; N]) -> Self {
        FilterValues(values.into_iter().map(Into::into).collect())
    }
}

// Heterogeneous value tuples, e.g. `(3, "Hougang")`.
macro_rules! impl_tuple_filter {
    ($($name:ident),+) => {
        impl<$($name: Into<SqlValue>),+> From<($($name,)+)> for FilterValues {
            #[allow(non_snake_case)]
            fn from(($($name,)+): ($($name,)+)) -> Self {
                FilterValues(vec![$($name.into()),+])
            }
        }
    };
}

impl_tuple_filter!(A, B);
impl_tuple_filter!(A, B, C);
impl_tuple_filter!(A, B, C, D);

impl<V: Into<SqlValue>> FromIterator<V> for FilterValues {
    fn from_iter<I: IntoIterator<Item = V>>(iter: I) -> Self {
        FilterValues(iter.into_iter().map(Into::into).collect())
    }
}

/// Which rows a statement targets.
#[derive(Debug, Clone, PartialEq)]
pub enum ColumnFilter {
    /// `column IN (v1, v2, ...)`
    In { column: String, values: FilterValues },
    /// `c1 = v1 AND c2 = v2 ...`, matched positionally
    Equals {
        columns: Vec<String>,
        values: FilterValues,
    },
}

impl ColumnFilter {
    pub fn is_in(column: &str, values: impl Into<FilterValues>) -> Self {
        ColumnFilter::In {
            column: column.to_string(),
            values: values.into(),
        }
    }

    pub fn equals<C: AsRef<str>>(columns: &[C], values: impl Into<FilterValues>) -> Self {
        ColumnFilter::Equals {
            columns: columns.iter().map(|c| c.as_ref().to_string()).collect(),
            values: values.into(),
        }
    }

    /// Renders the WHERE predicate and its bound values.
    fn render(&self) -> Result<(String, Vec<SqlValue>)> {
        match self {
            ColumnFilter::In { column, values } => {
                check_identifier("filter column", column)?;
                if values.is_empty() {
                    return Err(BridgeError::Contract(format!(
                        "membership filter on '{}' needs at least one value",
                        column
                    )));
                }
                Ok((
                    format!("{} IN ({})", column, placeholders(values.len())),
                    values.as_slice().to_vec(),
                ))
            }
            ColumnFilter::Equals { columns, values } => {
                check_aligned("filter", columns, values.len())?;
                Ok((equality_list(columns, " AND "), values.as_slice().to_vec()))
            }
        }
    }
}

/// Column assignments applied to every row matching a filter.
#[derive(Debug, Clone, PartialEq)]
pub struct UpdateSpec {
    columns: Vec<String>,
    values: Vec<SqlValue>,
}

impl UpdateSpec {
    pub fn new<C: AsRef<str>>(columns: &[C], values: Vec<SqlValue>) -> Result<Self> {
        check_aligned("update", columns, values.len())?;
        Ok(UpdateSpec {
            columns: columns.iter().map(|c| c.as_ref().to_string()).collect(),
            values,
        })
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn values(&self) -> &[SqlValue] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }
}

fn check_identifier(what: &str, name: &str) -> Result<()> {
    if name.trim().is_empty() {
        return Err(BridgeError::Contract(format!("{} name is empty", what)));
    }
    Ok(())
}

fn check_columns<C: AsRef<str>>(what: &str, columns: &[C]) -> Result<()> {
    if columns.is_empty() {
        return Err(BridgeError::Contract(format!("{} needs at least one column", what)));
    }
    for column in columns {
        check_identifier(&format!("{} column", what), column.as_ref())?;
    }
    Ok(())
}

fn check_aligned<C: AsRef<str>>(what: &str, columns: &[C], value_count: usize) -> Result<()> {
    check_columns(what, columns)?;
    if columns.len() != value_count {
        return Err(BridgeError::Contract(format!(
            "{} has {} columns but {} values",
            what,
            columns.len(),
            value_count
        )));
    }
    Ok(())
}

fn placeholders(count: usize) -> String {
    vec!["?"; count].join(", ")
}

fn equality_list<C: AsRef<str>>(columns: &[C], separator: &str) -> String {
    columns
        .iter()
        .map(|c| format!("{} = ?", c.as_ref()))
        .collect::<Vec<_>>()
        .join(separator)
}

/// `SELECT * FROM <table>`
pub fn select_all(table: &str) -> Result<Statement> {
    check_identifier("table", table)?;
    Ok(Statement::new(table, format!("SELECT * FROM {}", table), 0, Vec::new()))
}

/// `SELECT * FROM <table> WHERE <filter>`
pub fn select_where(table: &str, filter: &ColumnFilter) -> Result<Statement> {
    check_identifier("table", table)?;
    let (predicate, params) = filter.render()?;
    Ok(Statement::new(
        table,
        format!("SELECT * FROM {} WHERE {}", table, predicate),
        params.len(),
        params,
    ))
}

/// `SELECT * FROM <table> WHERE <column> IN (?, ?, ...)`, one placeholder per value.
pub fn select_where_in(
    table: &str,
    column: &str,
    values: impl Into<FilterValues>,
) -> Result<Statement> {
    select_where(table, &ColumnFilter::is_in(column, values))
}

/// `SELECT * FROM <table> WHERE c1 = ? AND c2 = ? ...`
pub fn select_where_equals<C: AsRef<str>>(
    table: &str,
    columns: &[C],
    values: impl Into<FilterValues>,
) -> Result<Statement> {
    select_where(table, &ColumnFilter::equals(columns, values))
}

/// The INSERT shared by every row of a bulk insert into `columns`, with no
/// values bound yet.
pub fn insert_template<C: AsRef<str>>(table: &str, columns: &[C]) -> Result<Statement> {
    check_identifier("table", table)?;
    check_columns("insert", columns)?;
    let names: Vec<&str> = columns.iter().map(|c| c.as_ref()).collect();
    let sql = format!(
        "INSERT INTO {} ({}) VALUES ({})",
        table,
        names.join(", "),
        placeholders(columns.len())
    );
    Ok(Statement::new(table, sql, columns.len(), Vec::new()))
}

/// `INSERT INTO <table> (c1, c2, ...) VALUES (?, ?, ...)`
pub fn insert_row<C: AsRef<str>>(
    table: &str,
    columns: &[C],
    row_values: Vec<SqlValue>,
) -> Result<Statement> {
    check_aligned("insert", columns, row_values.len())?;
    let mut stmt = insert_template(table, columns)?;
    stmt.params = row_values;
    Ok(stmt)
}

/// `UPDATE <table> SET u1 = ?, ... WHERE <filter>`
///
/// Parameters are the update values followed by the filter values, matching
/// placeholder order.
pub fn update_where(table: &str, filter: &ColumnFilter, update: &UpdateSpec) -> Result<Statement> {
    check_identifier("table", table)?;
    check_aligned("update", update.columns(), update.values().len())?;
    let (predicate, filter_params) = filter.render()?;

    let mut params = update.values().to_vec();
    params.extend(filter_params);
    let placeholders = params.len();

    Ok(Statement::new(
        table,
        format!(
            "UPDATE {} SET {} WHERE {}",
            table,
            equality_list(update.columns(), ", "),
            predicate
        ),
        placeholders,
        params,
    ))
}

/// `UPDATE <table> SET u1 = ?, ... WHERE f1 = ? AND f2 = ? ...`
pub fn update_where_equals<F: AsRef<str>, U: AsRef<str>>(
    table: &str,
    filter_columns: &[F],
    filter_values: impl Into<FilterValues>,
    update_columns: &[U],
    update_values: Vec<SqlValue>,
) -> Result<Statement> {
    let update = UpdateSpec::new(update_columns, update_values)?;
    update_where(table, &ColumnFilter::equals(filter_columns, filter_values), &update)
}
