//! Generic model use-case service.
//!
//! # Responsibility
//! - Wrap create/update/delete/status/sort/field writes into
//!   [`UpdateResult`] outcomes.
//! - Expose search, lookup and date-range helpers over one repository.
//!
//! # Invariants
//! - Mutating operations never return errors; every failure becomes a
//!   result code.
//! - Input fields unknown to the table schema are dropped before writes.
//! - List values are never written to a column.

use crate::date_range::{Clock, DateRangeResolver, SystemClock, TIMESTAMP_FORMAT};
use crate::error::{KitError, KitResult};
use crate::model::result::{ResultCode, UpdateResult};
use crate::model::value::{ParamValue, Params, Record, Row, Value};
use crate::query::page::{Page, ResultShape, SearchOutput};
use crate::query::params::{CompareOp, Condition, SearchParams};
use crate::query::relation::RelationDirectives;
use crate::repo::model_repo::ModelRepository;
use crate::service::auth::AuthContext;
use crate::service::registry::{EntityValidator, ValidatorRegistry};
use log::{info, warn};
use std::sync::Arc;

const MAX_SORT_VALUE_CHARS: usize = 255;
const MAX_FIELD_NAME_CHARS: usize = 50;

/// Single-column update request for [`ModelService::update_field`].
#[derive(Debug, Clone, PartialEq)]
pub struct FieldUpdate {
    pub id: Value,
    pub field: String,
    pub value: Value,
    /// Reject values already stored on another row.
    pub is_unique: bool,
    /// Accept a blank value.
    pub can_null: bool,
}

impl FieldUpdate {
    pub fn new(id: impl Into<Value>, field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self {
            id: id.into(),
            field: field.into(),
            value: value.into(),
            is_unique: false,
            can_null: false,
        }
    }

    pub fn unique(mut self) -> Self {
        self.is_unique = true;
        self
    }

    pub fn nullable(mut self) -> Self {
        self.can_null = true;
        self
    }
}

/// CRUD wrappers and search entry points for one entity.
pub struct ModelService<R: ModelRepository> {
    repo: R,
    validator: Option<Arc<dyn EntityValidator>>,
    auth: Option<Arc<dyn AuthContext>>,
    clock: Arc<dyn Clock>,
}

impl<R: ModelRepository> ModelService<R> {
    /// Creates a service with no validator, no actor and the system clock.
    pub fn new(repo: R) -> Self {
        Self {
            repo,
            validator: None,
            auth: None,
            clock: Arc::new(SystemClock),
        }
    }

    /// Attaches the validator registered for this entity, if any.
    pub fn with_validators(mut self, registry: &ValidatorRegistry) -> Self {
        self.validator = registry.get(&self.repo.entity().name);
        self
    }

    pub fn with_auth(mut self, auth: Arc<dyn AuthContext>) -> Self {
        self.auth = Some(auth);
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn repository(&self) -> &R {
        &self.repo
    }

    /// Inserts one record.
    ///
    /// # Contract
    /// - `456` when the validator rejects the input.
    /// - `302` for non-scalar input or any persistence failure.
    /// - `200` with `insertId` on success.
    pub fn create(&self, input: &Params) -> UpdateResult {
        if let Some(validator) = &self.validator {
            if let Err(message) = validator.validate_create(input) {
                return self.rejected("model_create", ResultCode::Invalid, message);
            }
        }

        match self.try_create(input) {
            Ok(id) => {
                info!(
                    "event=model_create module=service status=ok entity={} id={}",
                    self.entity_name(),
                    id
                );
                UpdateResult::inserted("created", id)
            }
            Err(err) => self.rejected("model_create", ResultCode::Rejected, err.to_string()),
        }
    }

    fn try_create(&self, input: &Params) -> KitResult<Value> {
        let mut row = self.to_row(input)?;
        let schema = self.repo.schema();
        let columns = &self.repo.config().columns;

        if let Some(auth) = &self.auth {
            if schema.has_column(&columns.created_user) {
                row.insert(
                    columns.created_user.as_str(),
                    auth.current_actor_id().unwrap_or(0),
                );
            }
        }
        if schema.has_column(&columns.sort) && is_falsy(row.get(&columns.sort)) {
            row.insert(columns.sort.as_str(), self.repo.max_value(&columns.sort)? + 1);
        }
        let now = self.now_text();
        for column in [&columns.created_at, &columns.updated_at] {
            if schema.has_column(column) && is_blank(row.get(column)) {
                row.insert(column.as_str(), now.as_str());
            }
        }

        self.repo.insert(&row)
    }

    /// Updates one record located by the primary key in `input`.
    ///
    /// # Contract
    /// - `456` when the validator rejects the input.
    /// - `302` when the primary key is missing, input is non-scalar or the
    ///   write fails.
    /// - `404` when no record has that key.
    /// - `200` with `updateId` on success.
    pub fn update(&self, input: &Params) -> UpdateResult {
        if let Some(validator) = &self.validator {
            if let Err(message) = validator.validate_update(input) {
                return self.rejected("model_update", ResultCode::Invalid, message);
            }
        }

        let id = match input.get(&self.repo.entity().primary_key) {
            Some(ParamValue::Scalar(value)) if !value.is_blank() => value.clone(),
            _ => {
                return self.rejected(
                    "model_update",
                    ResultCode::Rejected,
                    "primary key is required".to_string(),
                )
            }
        };

        match self.try_update(&id, input) {
            Ok(()) => {
                info!(
                    "event=model_update module=service status=ok entity={} id={}",
                    self.entity_name(),
                    id
                );
                UpdateResult::updated("updated", id)
            }
            Err(err @ KitError::NotFound { .. }) => {
                self.rejected("model_update", ResultCode::NotFound, err.to_string())
            }
            Err(err) => self.rejected("model_update", ResultCode::Rejected, err.to_string()),
        }
    }

    fn try_update(&self, id: &Value, input: &Params) -> KitResult<()> {
        self.require_existing(id)?;
        let mut row = self.to_row(input)?;
        row.remove(&self.repo.entity().primary_key);
        if !row.is_empty() {
            self.touch(&mut row);
        }
        self.repo.update(id, &row)?;
        Ok(())
    }

    /// Deletes one record.
    ///
    /// # Contract
    /// - `456` for a falsy key (checked before any query), a validator
    ///   rejection, or when nothing was deleted.
    /// - `500` on persistence failure.
    pub fn delete(&self, id: &Value) -> UpdateResult {
        if is_falsy_key(id) {
            return self.rejected(
                "model_delete",
                ResultCode::Invalid,
                "primary key is required".to_string(),
            );
        }
        if let Some(validator) = &self.validator {
            if let Err(message) = validator.validate_delete(id) {
                return self.rejected("model_delete", ResultCode::Invalid, message);
            }
        }

        match self.repo.delete(id) {
            Ok(0) => self.rejected("model_delete", ResultCode::Invalid, "nothing deleted".to_string()),
            Ok(_) => {
                info!(
                    "event=model_delete module=service status=ok entity={} id={}",
                    self.entity_name(),
                    id
                );
                UpdateResult::ok("deleted")
            }
            Err(err) => self.rejected("model_delete", ResultCode::Internal, err.to_string()),
        }
    }

    /// Flips the status column between the entity's sentinels.
    ///
    /// The `on` sentinel becomes `off`; any other value becomes `on`.
    pub fn toggle_status(&self, id: &Value) -> UpdateResult {
        if is_falsy_key(id) {
            return self.rejected(
                "model_toggle_status",
                ResultCode::Invalid,
                "primary key is required".to_string(),
            );
        }

        match self.try_toggle_status(id) {
            Ok(next) => {
                info!(
                    "event=model_toggle_status module=service status=ok entity={} id={} value={}",
                    self.entity_name(),
                    id,
                    next
                );
                UpdateResult::ok("status updated")
            }
            Err(err @ KitError::NotFound { .. }) => {
                self.rejected("model_toggle_status", ResultCode::NotFound, err.to_string())
            }
            Err(err) => self.rejected("model_toggle_status", ResultCode::Internal, err.to_string()),
        }
    }

    fn try_toggle_status(&self, id: &Value) -> KitResult<Value> {
        let record = self.require_existing(id)?;
        let entity = self.repo.entity();
        let sentinels = entity.status.as_ref().ok_or_else(|| KitError::MissingConstant {
            entity: entity.name.clone(),
            constant: "on",
        })?;
        let column = entity
            .status_column
            .as_deref()
            .unwrap_or(self.repo.config().columns.status.as_str());
        self.repo.schema().require(column)?;

        let next = match record.get(column) {
            Some(current) if current.loosely_eq(&sentinels.on) => sentinels.off.clone(),
            _ => sentinels.on.clone(),
        };
        let mut row = Row::new().with(column, next.clone());
        self.touch(&mut row);
        self.repo.update(id, &row)?;
        Ok(next)
    }

    /// Writes a sort value; `field` defaults to the configured sort column.
    ///
    /// Every failure reports `456`.
    pub fn update_sort(&self, id: &Value, value: &Value, field: Option<&str>) -> UpdateResult {
        let field = field.unwrap_or(self.repo.config().columns.sort.as_str());
        match self.try_update_sort(id, value, field) {
            Ok(()) => {
                info!(
                    "event=model_update_sort module=service status=ok entity={} id={} field={}",
                    self.entity_name(),
                    id,
                    field
                );
                UpdateResult::ok("sort updated")
            }
            Err(err) => self.rejected("model_update_sort", ResultCode::Invalid, err.to_string()),
        }
    }

    fn try_update_sort(&self, id: &Value, value: &Value, field: &str) -> KitResult<()> {
        if is_falsy_key(id) || id.as_i64().is_none() {
            return Err(KitError::Validation(
                "primary key must be an integer".to_string(),
            ));
        }
        if value.is_blank() {
            return Err(KitError::Validation("sort value is required".to_string()));
        }
        if value.to_string().chars().count() > MAX_SORT_VALUE_CHARS {
            return Err(KitError::Validation(format!(
                "sort value exceeds {MAX_SORT_VALUE_CHARS} characters"
            )));
        }
        if field.is_empty() || field.chars().count() > MAX_FIELD_NAME_CHARS {
            return Err(KitError::Validation(format!(
                "sort field must be 1 to {MAX_FIELD_NAME_CHARS} characters"
            )));
        }
        self.repo.schema().require(field)?;
        if !self.repo.exists(id, true)? {
            return Err(self.not_found(id));
        }

        let mut row = Row::new().with(field, value.clone());
        self.touch(&mut row);
        self.repo.update(id, &row)?;
        Ok(())
    }

    /// Updates one column of one record.
    ///
    /// Soft-deleted records count as missing. The validator's
    /// `after_field_update` hook runs after a successful write. Every
    /// failure reports `456`.
    pub fn update_field(&self, request: &FieldUpdate) -> UpdateResult {
        match self.try_update_field(request) {
            Ok(()) => {
                if let Some(validator) = &self.validator {
                    validator.after_field_update(&request.id, &request.field, &request.value);
                }
                info!(
                    "event=model_update_field module=service status=ok entity={} id={} field={}",
                    self.entity_name(),
                    request.id,
                    request.field
                );
                UpdateResult::ok("field updated")
            }
            Err(err) => self.rejected("model_update_field", ResultCode::Invalid, err.to_string()),
        }
    }

    fn try_update_field(&self, request: &FieldUpdate) -> KitResult<()> {
        if is_falsy_key(&request.id) {
            return Err(KitError::Validation("primary key is required".to_string()));
        }
        let field = request.field.trim();
        if field.is_empty() {
            return Err(KitError::Validation("field is required".to_string()));
        }
        if field == self.repo.entity().primary_key {
            return Err(KitError::Validation(
                "primary key cannot be updated".to_string(),
            ));
        }
        self.repo.schema().require(field)?;
        if request.value.is_falsy() && !request.can_null {
            return Err(KitError::Validation(format!("`{field}` must not be empty")));
        }
        if !self.repo.exists(&request.id, false)? {
            return Err(self.not_found(&request.id));
        }
        if request.is_unique
            && !request.value.is_falsy()
            && self.repo.count_duplicates(field, &request.value, &request.id)? > 0
        {
            return Err(KitError::Validation(format!(
                "`{field}` value already exists"
            )));
        }

        let mut row = Row::new().with(field, request.value.clone());
        self.touch(&mut row);
        self.repo.update(&request.id, &row)?;
        Ok(())
    }

    /// Loads one record by primary key.
    pub fn find_one(&self, id: &Value) -> KitResult<Option<Record>> {
        self.repo.find(id)
    }

    /// Loads one column of a record; the column must exist.
    pub fn find_one_field(&self, id: &Value, field: &str) -> KitResult<Option<Value>> {
        self.repo.schema().require(field)?;
        Ok(self
            .repo
            .find(id)?
            .and_then(|record| record.get(field).cloned()))
    }

    pub fn find_by_field(
        &self,
        params: &SearchParams,
        relations: &RelationDirectives,
    ) -> KitResult<Option<Record>> {
        self.repo.find_by_field(params, relations)
    }

    pub fn search(
        &self,
        params: &SearchParams,
        relations: &RelationDirectives,
        shape: ResultShape,
    ) -> KitResult<SearchOutput> {
        self.repo.search(params, relations, shape)
    }

    pub fn paginate(&self, params: &SearchParams, relations: &RelationDirectives) -> KitResult<Page> {
        match self.repo.search(params, relations, ResultShape::Paginated)? {
            SearchOutput::Page(page) => Ok(page),
            SearchOutput::Collection(records) => {
                let total = records.len() as u64;
                let per_page = u32::try_from(records.len()).unwrap_or(u32::MAX);
                Ok(Page::new(records, total, per_page, 1, params.clone()))
            }
        }
    }

    pub fn all(&self, params: &SearchParams, relations: &RelationDirectives) -> KitResult<Vec<Record>> {
        Ok(self
            .repo
            .search(params, relations, ResultShape::All)?
            .into_records())
    }

    /// Range conditions `field >= start` and `field <= end` for a preset.
    ///
    /// `field` defaults to the configured `created_at` column. Unresolved
    /// presets yield no conditions.
    pub fn date_conditions(
        &self,
        preset: &str,
        horizon: &str,
        field: Option<&str>,
    ) -> KitResult<Vec<Condition>> {
        let field = field.unwrap_or(self.repo.config().columns.created_at.as_str());
        self.repo.schema().require(field)?;

        let resolver = DateRangeResolver::new(Arc::clone(&self.clock));
        Ok(match resolver.resolve(preset, horizon) {
            Some(range) => vec![
                Condition::new(field, CompareOp::Ge, range.start_text()),
                Condition::new(field, CompareOp::Le, range.end_text()),
            ],
            None => Vec::new(),
        })
    }

    /// `MAX(field) + 1`; `field` defaults to the configured sort column.
    pub fn next_sort_value(&self, field: Option<&str>) -> KitResult<i64> {
        let field = field.unwrap_or(self.repo.config().columns.sort.as_str());
        self.repo.schema().require(field)?;
        Ok(self.repo.max_value(field)? + 1)
    }

    pub fn next_primary_key_value(&self) -> KitResult<i64> {
        Ok(self.repo.max_value(&self.repo.entity().primary_key)? + 1)
    }

    /// Batch update on this entity's table, skipping the schema check of
    /// the reference column.
    pub fn update_all_batch_by_entity(&self, rows: &[Row]) -> bool {
        self.repo.update_batch(rows)
    }

    fn entity_name(&self) -> &str {
        &self.repo.entity().name
    }

    fn now_text(&self) -> String {
        self.clock.now().format(TIMESTAMP_FORMAT).to_string()
    }

    /// Sets `updated_at` when the table has it.
    fn touch(&self, row: &mut Row) {
        let column = self.repo.config().columns.updated_at.as_str();
        if self.repo.schema().has_column(column) && !row.contains_key(column) {
            row.insert(column, self.now_text());
        }
    }

    fn to_row(&self, input: &Params) -> KitResult<Row> {
        let mut row = Row::new();
        for (key, value) in input.iter() {
            let value = match value {
                ParamValue::Scalar(value) => value,
                ParamValue::List(_) => return Err(KitError::NonScalarField(key.to_string())),
            };
            if self.repo.schema().has_column(key) {
                row.insert(key, value.clone());
            }
        }
        Ok(row)
    }

    fn require_existing(&self, id: &Value) -> KitResult<Record> {
        self.repo.find(id)?.ok_or_else(|| self.not_found(id))
    }

    fn not_found(&self, id: &Value) -> KitError {
        KitError::NotFound {
            entity: self.entity_name().to_string(),
            id: id.to_string(),
        }
    }

    fn rejected(&self, event: &str, code: ResultCode, message: String) -> UpdateResult {
        warn!(
            "event={} module=service status=error entity={} code={} error={}",
            event,
            self.entity_name(),
            code.as_u16(),
            message
        );
        UpdateResult::new(code, message)
    }
}

fn is_blank(value: Option<&Value>) -> bool {
    value.map_or(true, Value::is_blank)
}

fn is_falsy(value: Option<&Value>) -> bool {
    value.map_or(true, Value::is_falsy)
}

/// `NULL`, `0`, `""` and `"0"` do not identify a record.
fn is_falsy_key(id: &Value) -> bool {
    match id {
        Value::Null => true,
        Value::Integer(value) => *value == 0,
        Value::Real(value) => *value == 0.0,
        Value::Text(text) => text.trim().is_empty() || text.trim() == "0",
    }
}
