//! Statement builder state.
//!
//! [`StatementModel`] accumulates the clauses of one statement. It knows
//! nothing about connections or dialects; a [`Compiler`](crate::Compiler)
//! turns it into template text and [`Statement`](crate::Statement) binds it
//! to a connection for execution.
//!
//! Every clause follows the same shape: a getter, `set_*` (replace or merge),
//! `add_*` (append one) and `remove_*` (one entry, or everything with `None`).
//!
//! Filter types and custom fragment names must be declared with
//! [`StatementModel::support_filter`] / [`StatementModel::support_custom`]
//! before use. Using an undeclared one is a logic error.

use crate::context::Context;
use crate::error::{WeaveError, WeaveResult};
use crate::value::Value;
use std::collections::BTreeSet;

/// Filter type rendered as `WHERE`.
pub const FILTER_WHERE: &str = "where";
/// Filter type rendered as `HAVING`.
pub const FILTER_HAVING: &str = "having";

/// Custom fragments inserted right after the command keyword.
pub const CUSTOM_PREFIX: &str = "prefix";
/// Custom fragments appended at the end of the statement.
pub const CUSTOM_SUFFIX: &str = "suffix";
/// `RETURNING` columns (Postgres compiler only).
pub const CUSTOM_RETURNING: &str = "returning";

/// `SELECT DISTINCT`.
pub const FLAG_DISTINCT: &str = "distinct";
/// `SELECT ... FOR UPDATE`.
pub const FLAG_FOR_UPDATE: &str = "for_update";
/// `INSERT IGNORE` / `UPDATE IGNORE` / `DELETE IGNORE` (standard compiler).
pub const FLAG_IGNORE: &str = "ignore";

/// Context subtree holding the values of one filter type.
pub fn filter_context_path(kind: &str) -> String {
    format!("filter.{}", kind.to_ascii_lowercase())
}

/// Table or field definition: SQL text, or a nested statement rendered as a
/// parenthesized sub-select.
#[derive(Debug, Clone, PartialEq)]
pub enum Definition {
    Expr(String),
    Nested(Box<StatementModel>),
}

impl Definition {
    pub fn as_expr(&self) -> Option<&str> {
        match self {
            Self::Expr(s) => Some(s),
            Self::Nested(_) => None,
        }
    }
}

impl From<&str> for Definition {
    fn from(s: &str) -> Self {
        Self::Expr(s.to_string())
    }
}

impl From<String> for Definition {
    fn from(s: String) -> Self {
        Self::Expr(s)
    }
}

impl From<StatementModel> for Definition {
    fn from(model: StatementModel) -> Self {
        Self::Nested(Box::new(model))
    }
}

/// How a non-first table is joined.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum JoinKind {
    #[default]
    Inner,
    Left,
    Right,
}

impl JoinKind {
    pub fn as_sql(self) -> &'static str {
        match self {
            Self::Inner => "INNER JOIN",
            Self::Left => "LEFT JOIN",
            Self::Right => "RIGHT JOIN",
        }
    }
}

/// One entry of the table list.
#[derive(Debug, Clone, PartialEq)]
pub struct TableRef {
    definition: Definition,
    join_filter: Option<String>,
    join_kind: JoinKind,
}

impl TableRef {
    pub fn new(definition: impl Into<Definition>) -> Self {
        Self {
            definition: definition.into(),
            join_filter: None,
            join_kind: JoinKind::Inner,
        }
    }

    /// Set the join kind and `ON` filter.
    pub fn join(mut self, kind: JoinKind, filter: Option<&str>) -> Self {
        self.join_kind = kind;
        self.join_filter = filter.map(str::to_string);
        self
    }

    pub fn definition(&self) -> &Definition {
        &self.definition
    }

    pub fn join_filter(&self) -> Option<&str> {
        self.join_filter.as_deref()
    }

    pub fn join_kind(&self) -> JoinKind {
        self.join_kind
    }
}

/// Connective placed before a filter fragment (ignored for the first one).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Glue {
    #[default]
    And,
    Or,
}

impl Glue {
    pub fn as_sql(self) -> &'static str {
        match self {
            Self::And => "AND",
            Self::Or => "OR",
        }
    }
}

/// One filter fragment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Filter {
    expression: String,
    glue: Glue,
}

impl Filter {
    /// Fragment glued with `AND`.
    pub fn new(expression: impl Into<String>) -> Self {
        Self {
            expression: expression.into(),
            glue: Glue::And,
        }
    }

    /// Fragment glued with `OR`.
    pub fn or(expression: impl Into<String>) -> Self {
        Self {
            expression: expression.into(),
            glue: Glue::Or,
        }
    }

    pub fn expression(&self) -> &str {
        &self.expression
    }

    pub fn glue(&self) -> Glue {
        self.glue
    }
}

impl From<&str> for Filter {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for Filter {
    fn from(s: String) -> Self {
        Self::new(s)
    }
}

/// A `GROUP BY` / `ORDER BY` entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderItem {
    expression: String,
    descending: bool,
}

impl OrderItem {
    pub fn new(expression: impl Into<String>, descending: bool) -> Self {
        Self {
            expression: expression.into(),
            descending,
        }
    }

    pub fn expression(&self) -> &str {
        &self.expression
    }

    pub fn descending(&self) -> bool {
        self.descending
    }

    /// Validate a dynamic `[expression, descending]` pair.
    fn from_value(item: &Value) -> WeaveResult<Self> {
        let pair = item
            .as_list()
            .filter(|pair| pair.len() == 2)
            .ok_or_else(|| {
                WeaveError::invalid_argument(format!(
                    "expected an (expression, descending) pair, got {item:?}"
                ))
            })?;
        let expression = pair[0].as_str().ok_or_else(|| {
            WeaveError::invalid_argument(format!("pair expression must be text, got {:?}", pair[0]))
        })?;
        let descending = pair[1].as_bool().ok_or_else(|| {
            WeaveError::invalid_argument(format!("pair flag must be boolean, got {:?}", pair[1]))
        })?;
        Ok(Self::new(expression, descending))
    }
}

/// Clause state of one statement plus its default context.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StatementModel {
    tables: Vec<(String, TableRef)>,
    fields: Vec<(String, Definition)>,
    filters: Vec<(String, Vec<Filter>)>,
    group: Vec<OrderItem>,
    sort: Vec<OrderItem>,
    limit: u64,
    offset: u64,
    flags: BTreeSet<String>,
    customs: Vec<(String, Vec<String>)>,
    context: Context,
}

impl StatementModel {
    /// Empty model with nothing declared.
    pub fn new() -> Self {
        Self::default()
    }

    /// Model with the given filter types and custom names declared.
    pub fn with_support(filters: &[&str], customs: &[&str]) -> Self {
        let mut model = Self::new();
        for kind in filters {
            model.support_filter(kind);
        }
        for name in customs {
            model.support_custom(name);
        }
        model
    }

    // ==================== Tables ====================

    /// Tables in insertion (join) order.
    pub fn tables(&self) -> impl Iterator<Item = (&str, &TableRef)> {
        self.tables.iter().map(|(alias, t)| (alias.as_str(), t))
    }

    pub fn table(&self, alias: &str) -> Option<&TableRef> {
        self.tables.iter().find(|(a, _)| a == alias).map(|(_, t)| t)
    }

    /// Append a table.
    ///
    /// Without an alias a text definition is its own alias; a nested statement
    /// must be aliased. Aliases are unique across tables and fields.
    pub fn add_table(
        &mut self,
        definition: impl Into<Definition>,
        alias: Option<&str>,
        join_filter: Option<&str>,
        join_kind: JoinKind,
    ) -> WeaveResult<&mut Self> {
        let definition = definition.into();
        let alias = derive_alias(&definition, alias)?;
        self.ensure_alias_free(&alias)?;
        let table = TableRef::new(definition).join(join_kind, join_filter);
        self.tables.push((alias, table));
        Ok(self)
    }

    /// Shorthand for an unaliased, unjoined table.
    pub fn from(&mut self, table: &str) -> WeaveResult<&mut Self> {
        self.add_table(table, None, None, JoinKind::Inner)
    }

    /// Replace the table list, or with `merge` overwrite/append by alias.
    pub fn set_tables(
        &mut self,
        tables: impl IntoIterator<Item = (String, TableRef)>,
        merge: bool,
    ) -> WeaveResult<&mut Self> {
        let incoming: Vec<_> = tables.into_iter().collect();
        if let Some((alias, _)) = incoming.iter().find(|(a, _)| self.has_field(a)) {
            return Err(WeaveError::DuplicateAlias(alias.clone()));
        }
        if !merge {
            self.tables.clear();
        }
        for (alias, table) in incoming {
            upsert(&mut self.tables, alias, table);
        }
        Ok(self)
    }

    /// Remove one table by alias, or all tables with `None`.
    pub fn remove_table(&mut self, alias: Option<&str>) -> &mut Self {
        match alias {
            Some(alias) => self.tables.retain(|(a, _)| a != alias),
            None => self.tables.clear(),
        }
        self
    }

    // ==================== Fields ====================

    /// Fields in insertion order.
    pub fn fields(&self) -> impl Iterator<Item = (&str, &Definition)> {
        self.fields.iter().map(|(alias, d)| (alias.as_str(), d))
    }

    pub fn field(&self, alias: &str) -> Option<&Definition> {
        self.fields.iter().find(|(a, _)| a == alias).map(|(_, d)| d)
    }

    /// Append a field. Alias rules match [`StatementModel::add_table`].
    pub fn add_field(
        &mut self,
        definition: impl Into<Definition>,
        alias: Option<&str>,
    ) -> WeaveResult<&mut Self> {
        let definition = definition.into();
        let alias = derive_alias(&definition, alias)?;
        self.ensure_alias_free(&alias)?;
        self.fields.push((alias, definition));
        Ok(self)
    }

    /// Replace the field list, or with `merge` overwrite/append by alias.
    pub fn set_fields(
        &mut self,
        fields: impl IntoIterator<Item = (String, Definition)>,
        merge: bool,
    ) -> WeaveResult<&mut Self> {
        let incoming: Vec<_> = fields.into_iter().collect();
        if let Some((alias, _)) = incoming.iter().find(|(a, _)| self.has_table(a)) {
            return Err(WeaveError::DuplicateAlias(alias.clone()));
        }
        if !merge {
            self.fields.clear();
        }
        for (alias, definition) in incoming {
            upsert(&mut self.fields, alias, definition);
        }
        Ok(self)
    }

    /// Remove one field by alias, or all fields with `None`.
    pub fn remove_field(&mut self, alias: Option<&str>) -> &mut Self {
        match alias {
            Some(alias) => self.fields.retain(|(a, _)| a != alias),
            None => self.fields.clear(),
        }
        self
    }

    fn has_table(&self, alias: &str) -> bool {
        self.tables.iter().any(|(a, _)| a == alias)
    }

    fn has_field(&self, alias: &str) -> bool {
        self.fields.iter().any(|(a, _)| a == alias)
    }

    fn ensure_alias_free(&self, alias: &str) -> WeaveResult<()> {
        if self.has_table(alias) || self.has_field(alias) {
            return Err(WeaveError::DuplicateAlias(alias.to_string()));
        }
        Ok(())
    }

    // ==================== Filters ====================

    /// Declare a filter type. Idempotent.
    pub fn support_filter(&mut self, kind: &str) -> &mut Self {
        let kind = kind.to_ascii_lowercase();
        if !self.filters.iter().any(|(k, _)| *k == kind) {
            self.filters.push((kind, Vec::new()));
        }
        self
    }

    pub fn supports_filter(&self, kind: &str) -> bool {
        self.filter_slot(kind).is_some()
    }

    /// Declared filter types with their fragments, in declaration order.
    pub fn filter_groups(&self) -> impl Iterator<Item = (&str, &[Filter])> {
        self.filters.iter().map(|(k, f)| (k.as_str(), f.as_slice()))
    }

    pub fn filters(&self, kind: &str) -> WeaveResult<&[Filter]> {
        let kind = kind.to_ascii_lowercase();
        self.filters
            .iter()
            .find(|(k, _)| *k == kind)
            .map(|(_, f)| f.as_slice())
            .ok_or(WeaveError::UnsupportedFilter(kind))
    }

    /// Append one fragment; `context` is merged under `filter.<kind>`.
    pub fn add_filter(
        &mut self,
        kind: &str,
        filter: impl Into<Filter>,
        context: Option<Context>,
    ) -> WeaveResult<&mut Self> {
        let slot = self.filter_slot_mut(kind)?;
        slot.push(filter.into());
        if let Some(ctx) = context {
            self.context.merge_at(&filter_context_path(kind), ctx);
        }
        Ok(self)
    }

    /// `add_filter(FILTER_WHERE, ..)`.
    pub fn add_where(
        &mut self,
        filter: impl Into<Filter>,
        context: Option<Context>,
    ) -> WeaveResult<&mut Self> {
        self.add_filter(FILTER_WHERE, filter, context)
    }

    /// `add_filter(FILTER_HAVING, ..)`.
    pub fn add_having(
        &mut self,
        filter: impl Into<Filter>,
        context: Option<Context>,
    ) -> WeaveResult<&mut Self> {
        self.add_filter(FILTER_HAVING, filter, context)
    }

    /// Replace a filter type's fragments and context subtree.
    ///
    /// With `merge`, the new fragments are placed ahead of the existing ones
    /// (exact duplicates skipped) and the context is merged, not cleared.
    pub fn set_filter(
        &mut self,
        kind: &str,
        filters: impl IntoIterator<Item = Filter>,
        context: Option<Context>,
        merge: bool,
    ) -> WeaveResult<&mut Self> {
        let path = filter_context_path(kind);
        let slot = self.filter_slot_mut(kind)?;
        let incoming: Vec<Filter> = filters.into_iter().collect();
        if merge {
            let existing = std::mem::take(slot);
            let mut combined = incoming;
            for filter in existing {
                if !combined.contains(&filter) {
                    combined.push(filter);
                }
            }
            *slot = combined;
        } else {
            *slot = incoming;
            self.context.unset(&path);
        }
        if let Some(ctx) = context {
            self.context.merge_at(&path, ctx);
        }
        Ok(self)
    }

    /// Remove fragments and/or context keys.
    ///
    /// - `kind = None`: clear every declared type (declarations are kept).
    /// - `expression = None`: clear that type's fragments.
    /// - `expression = Some(e)`: remove the first fragment whose text equals `e`.
    ///
    /// `context_keys` are removed from `filter.<kind>` (from every declared
    /// type when `kind` is `None`).
    pub fn remove_filter(
        &mut self,
        kind: Option<&str>,
        expression: Option<&str>,
        context_keys: &[&str],
    ) -> WeaveResult<&mut Self> {
        let Some(kind) = kind else {
            let kinds: Vec<String> = self.filters.iter().map(|(k, _)| k.clone()).collect();
            for (_, slot) in &mut self.filters {
                slot.clear();
            }
            for kind in &kinds {
                self.unset_filter_keys(kind, context_keys);
            }
            return Ok(self);
        };

        let slot = self.filter_slot_mut(kind)?;
        match expression {
            Some(expr) => {
                if let Some(pos) = slot.iter().position(|f| f.expression == expr) {
                    slot.remove(pos);
                }
            }
            None => slot.clear(),
        }
        self.unset_filter_keys(kind, context_keys);
        Ok(self)
    }

    fn unset_filter_keys(&mut self, kind: &str, keys: &[&str]) {
        let base = filter_context_path(kind);
        for key in keys {
            self.context.unset(&format!("{base}.{key}"));
        }
    }

    fn filter_slot(&self, kind: &str) -> Option<&Vec<Filter>> {
        let kind = kind.to_ascii_lowercase();
        self.filters.iter().find(|(k, _)| *k == kind).map(|(_, f)| f)
    }

    fn filter_slot_mut(&mut self, kind: &str) -> WeaveResult<&mut Vec<Filter>> {
        let kind = kind.to_ascii_lowercase();
        match self.filters.iter().position(|(k, _)| *k == kind) {
            Some(pos) => Ok(&mut self.filters[pos].1),
            None => Err(WeaveError::UnsupportedFilter(kind)),
        }
    }

    // ==================== Group / Sort ====================

    pub fn group(&self) -> &[OrderItem] {
        &self.group
    }

    pub fn add_group(&mut self, expression: impl Into<String>, descending: bool) -> &mut Self {
        self.group.push(OrderItem::new(expression, descending));
        self
    }

    /// Replace (or with `merge`, extend) the group list.
    pub fn set_group<S: Into<String>>(
        &mut self,
        items: impl IntoIterator<Item = (S, bool)>,
        merge: bool,
    ) -> &mut Self {
        let items = items.into_iter().map(|(e, d)| OrderItem::new(e, d));
        set_order_items(&mut self.group, items, merge);
        self
    }

    /// Dynamic form of [`StatementModel::set_group`]: every item must be a
    /// two-element `[expression, descending]` list.
    pub fn set_group_values(&mut self, items: &[Value], merge: bool) -> WeaveResult<&mut Self> {
        let items = items
            .iter()
            .map(OrderItem::from_value)
            .collect::<WeaveResult<Vec<_>>>()?;
        set_order_items(&mut self.group, items, merge);
        Ok(self)
    }

    /// Remove one group expression, or all with `None`.
    pub fn remove_group(&mut self, expression: Option<&str>) -> &mut Self {
        remove_order_item(&mut self.group, expression);
        self
    }

    pub fn sort(&self) -> &[OrderItem] {
        &self.sort
    }

    pub fn add_sort(&mut self, expression: impl Into<String>, descending: bool) -> &mut Self {
        self.sort.push(OrderItem::new(expression, descending));
        self
    }

    /// Replace (or with `merge`, extend) the sort list.
    pub fn set_sort<S: Into<String>>(
        &mut self,
        items: impl IntoIterator<Item = (S, bool)>,
        merge: bool,
    ) -> &mut Self {
        let items = items.into_iter().map(|(e, d)| OrderItem::new(e, d));
        set_order_items(&mut self.sort, items, merge);
        self
    }

    /// Dynamic form of [`StatementModel::set_sort`].
    pub fn set_sort_values(&mut self, items: &[Value], merge: bool) -> WeaveResult<&mut Self> {
        let items = items
            .iter()
            .map(OrderItem::from_value)
            .collect::<WeaveResult<Vec<_>>>()?;
        set_order_items(&mut self.sort, items, merge);
        Ok(self)
    }

    /// Remove one sort expression, or all with `None`.
    pub fn remove_sort(&mut self, expression: Option<&str>) -> &mut Self {
        remove_order_item(&mut self.sort, expression);
        self
    }

    // ==================== Limit ====================

    /// Row limit; `0` means no `LIMIT` clause.
    pub fn limit(&self) -> u64 {
        self.limit
    }

    pub fn offset(&self) -> u64 {
        self.offset
    }

    /// Set the limit and (optionally) the offset. Negative values are rejected.
    pub fn set_limit(&mut self, count: i64, offset: Option<i64>) -> WeaveResult<&mut Self> {
        let count = u64::try_from(count)
            .map_err(|_| WeaveError::invalid_argument(format!("negative limit: {count}")))?;
        let offset = offset
            .map(|o| {
                u64::try_from(o)
                    .map_err(|_| WeaveError::invalid_argument(format!("negative offset: {o}")))
            })
            .transpose()?;
        self.limit = count;
        if let Some(offset) = offset {
            self.offset = offset;
        }
        Ok(self)
    }

    /// Dynamic form of [`StatementModel::set_limit`]; values are coerced to integers.
    pub fn set_limit_values(
        &mut self,
        count: &Value,
        offset: Option<&Value>,
    ) -> WeaveResult<&mut Self> {
        let coerce = |v: &Value| {
            v.as_i64()
                .ok_or_else(|| WeaveError::invalid_argument(format!("not an integer: {v:?}")))
        };
        let count = coerce(count)?;
        let offset = offset.map(coerce).transpose()?;
        self.set_limit(count, offset)
    }

    // ==================== Flags ====================

    pub fn flags(&self) -> &BTreeSet<String> {
        &self.flags
    }

    pub fn has_flag(&self, name: &str) -> bool {
        self.flags.contains(name)
    }

    /// Add or remove one flag; `None` clears all flags.
    pub fn set_flag(&mut self, name: Option<&str>, enable: bool) -> &mut Self {
        match name {
            None => self.flags.clear(),
            Some(name) if enable => {
                self.flags.insert(name.to_string());
            }
            Some(name) => {
                self.flags.remove(name);
            }
        }
        self
    }

    // ==================== Custom fragments ====================

    /// Declare a custom fragment name (case-insensitive). Idempotent.
    pub fn support_custom(&mut self, name: &str) -> &mut Self {
        let name = name.to_ascii_lowercase();
        if !self.customs.iter().any(|(n, _)| *n == name) {
            self.customs.push((name, Vec::new()));
        }
        self
    }

    pub fn supports_custom(&self, name: &str) -> bool {
        let name = name.to_ascii_lowercase();
        self.customs.iter().any(|(n, _)| *n == name)
    }

    pub fn custom(&self, name: &str) -> WeaveResult<&[String]> {
        let name = name.to_ascii_lowercase();
        self.customs
            .iter()
            .find(|(n, _)| *n == name)
            .map(|(_, d)| d.as_slice())
            .ok_or(WeaveError::UnsupportedCustom(name))
    }

    pub fn add_custom(&mut self, name: &str, definition: impl Into<String>) -> WeaveResult<&mut Self> {
        self.custom_slot_mut(name)?.push(definition.into());
        Ok(self)
    }

    /// Replace (or with `merge`, extend) one custom fragment list.
    pub fn set_custom(
        &mut self,
        name: &str,
        definitions: impl IntoIterator<Item = String>,
        merge: bool,
    ) -> WeaveResult<&mut Self> {
        let slot = self.custom_slot_mut(name)?;
        if !merge {
            slot.clear();
        }
        slot.extend(definitions);
        Ok(self)
    }

    /// Remove custom fragments.
    ///
    /// `name = None` clears every list; `definition = None` clears one list;
    /// otherwise the first matching entry is removed.
    pub fn remove_custom(
        &mut self,
        name: Option<&str>,
        definition: Option<&str>,
    ) -> WeaveResult<&mut Self> {
        let Some(name) = name else {
            for (_, slot) in &mut self.customs {
                slot.clear();
            }
            return Ok(self);
        };
        let slot = self.custom_slot_mut(name)?;
        match definition {
            Some(def) => {
                if let Some(pos) = slot.iter().position(|d| d == def) {
                    slot.remove(pos);
                }
            }
            None => slot.clear(),
        }
        Ok(self)
    }

    fn custom_slot_mut(&mut self, name: &str) -> WeaveResult<&mut Vec<String>> {
        let name = name.to_ascii_lowercase();
        match self.customs.iter().position(|(n, _)| *n == name) {
            Some(pos) => Ok(&mut self.customs[pos].1),
            None => Err(WeaveError::UnsupportedCustom(name)),
        }
    }

    // ==================== Context ====================

    pub fn context(&self) -> &Context {
        &self.context
    }

    pub fn context_mut(&mut self) -> &mut Context {
        &mut self.context
    }

    /// Replace the default context, or deep-merge into it.
    pub fn set_context(&mut self, context: Context, merge: bool) -> &mut Self {
        if merge {
            self.context.merge(context);
        } else {
            self.context = context;
        }
        self
    }

    /// Set one default context value.
    pub fn bind(&mut self, path: &str, value: impl Into<Value>) -> &mut Self {
        self.context.set(path, value);
        self
    }
}

fn derive_alias(definition: &Definition, alias: Option<&str>) -> WeaveResult<String> {
    match (alias, definition) {
        (Some(alias), _) if !alias.is_empty() => Ok(alias.to_string()),
        (_, Definition::Expr(text)) if !text.is_empty() => Ok(text.clone()),
        (_, Definition::Expr(_)) => Err(WeaveError::invalid_argument("empty definition")),
        (_, Definition::Nested(_)) => Err(WeaveError::MissingAlias(
            "nested statement requires an alias".to_string(),
        )),
    }
}

fn upsert<T>(list: &mut Vec<(String, T)>, alias: String, value: T) {
    match list.iter_mut().find(|(a, _)| *a == alias) {
        Some(slot) => slot.1 = value,
        None => list.push((alias, value)),
    }
}

fn set_order_items(
    list: &mut Vec<OrderItem>,
    items: impl IntoIterator<Item = OrderItem>,
    merge: bool,
) {
    if !merge {
        list.clear();
    }
    for item in items {
        match list.iter_mut().find(|i| i.expression == item.expression) {
            Some(existing) => existing.descending = item.descending,
            None => list.push(item),
        }
    }
}

fn remove_order_item(list: &mut Vec<OrderItem>, expression: Option<&str>) {
    match expression {
        Some(expr) => list.retain(|i| i.expression != expr),
        None => list.clear(),
    }
}
