use async_trait::async_trait;

use crate::domain::Entity;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RepoError {
  #[error("{kind} {id} not found")]
  NotFound { kind: &'static str, id: String },
  #[error("storage error: {0}")]
  Storage(String),
}

impl RepoError {
  pub fn not_found<E: Entity>(id: E::Id) -> Self {
    RepoError::NotFound { kind: E::KIND, id: id.to_string() }
  }
}

/// Port de fuente de datos, uniforme para canciones, interpretaciones y usuarios.
///
/// Todas las operaciones son asíncronas: el adapter puede simular latencia
/// de red o hablar con un backend real sin que el dominio lo note.
#[async_trait]
pub trait DataSource<E: Entity>: Send + Sync {
  async fn get_all(&self) -> Result<Vec<E>, RepoError>;

  /// Falla con `RepoError::NotFound` si no existe.
  async fn get_by_id(&self, id: E::Id) -> Result<E, RepoError>;

  /// Devuelve la entidad con id generado y fecha de creación.
  async fn create(&self, draft: E::Draft) -> Result<E, RepoError>;

  /// Fusiona los campos parciales. Falla con `RepoError::NotFound` si no existe.
  async fn update(&self, id: E::Id, patch: E::Patch) -> Result<E, RepoError>;

  /// Falla con `RepoError::NotFound` si no existe.
  async fn delete(&self, id: E::Id) -> Result<bool, RepoError>;
}

#[async_trait]
impl<E, T> DataSource<E> for std::sync::Arc<T>
where
  E: Entity,
  T: DataSource<E> + ?Sized,
{
  async fn get_all(&self) -> Result<Vec<E>, RepoError> {
    (**self).get_all().await
  }

  async fn get_by_id(&self, id: E::Id) -> Result<E, RepoError> {
    (**self).get_by_id(id).await
  }

  async fn create(&self, draft: E::Draft) -> Result<E, RepoError> {
    (**self).create(draft).await
  }

  async fn update(&self, id: E::Id, patch: E::Patch) -> Result<E, RepoError> {
    (**self).update(id, patch).await
  }

  async fn delete(&self, id: E::Id) -> Result<bool, RepoError> {
    (**self).delete(id).await
  }
}
