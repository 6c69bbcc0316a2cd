use crate::errors::ErrorKind;

// El host implementa esto para mostrar avisos transitorios (toasts).
pub trait Notifier: Send + Sync {
  fn success(&self, message: &str);
  fn error(&self, kind: ErrorKind, message: &str);
}
