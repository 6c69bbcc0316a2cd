use chrono::{DateTime, Utc};
use std::fmt;

/// Entidad gestionada por una fuente de datos (`DataSource`).
///
/// Canciones, interpretaciones y usuarios comparten el mismo contrato CRUD:
/// - `Draft`: lo que el llamador aporta en `create` (sin id ni fecha).
/// - `Patch`: campos parciales que `update` fusiona sobre la entidad.
pub trait Entity: Clone + Send + Sync + 'static {
  type Id: Copy + Eq + fmt::Display + Send + Sync;
  type Draft: Send;
  type Patch: Send;

  /// Nombre legible del tipo, usado en errores (`"song"`, `"user"`…).
  const KIND: &'static str;

  fn id(&self) -> Self::Id;

  /// Construye la entidad con un id nuevo y la fecha de creación indicada.
  fn from_draft(draft: Self::Draft, created_at: DateTime<Utc>) -> Self;

  /// Fusiona los campos presentes en `patch`.
  fn apply(&mut self, patch: Self::Patch);
}
