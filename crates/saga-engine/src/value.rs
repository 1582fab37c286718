use std::any::{Any, type_name};

/// Trait for type-erased values threaded between saga steps.
///
/// This trait combines `Any` with `Clone` capability and the concrete type
/// name, so the engine can re-submit the same input on every retry and report
/// what it actually held when a type check fails.
pub(crate) trait ErasedValue: Any + Send {
    /// Clone the value into a new boxed trait object.
    fn clone_box(&self) -> Box<dyn ErasedValue>;

    /// Borrow as `Any` for downcasting by reference.
    fn as_any(&self) -> &dyn Any;

    /// Convert into a boxed `Any` for downcasting by value.
    fn into_any(self: Box<Self>) -> Box<dyn Any + Send>;

    /// Name of the concrete type behind the erasure.
    fn type_name(&self) -> &'static str;
}

impl<T> ErasedValue for T
where
    T: Clone + Send + 'static,
{
    fn clone_box(&self) -> Box<dyn ErasedValue> {
        Box::new(self.clone())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn into_any(self: Box<Self>) -> Box<dyn Any + Send> {
        self
    }

    fn type_name(&self) -> &'static str {
        type_name::<T>()
    }
}

/// Expected and actual type names of a failed downcast.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Mismatch {
    pub(crate) expected: &'static str,
    pub(crate) actual: &'static str,
}

/// Downcast an erased value by reference and clone out the typed value.
pub(crate) fn downcast_cloned<T>(value: &dyn ErasedValue) -> Result<T, Mismatch>
where
    T: Clone + 'static,
{
    value
        .as_any()
        .downcast_ref::<T>()
        .cloned()
        .ok_or_else(|| Mismatch {
            expected: type_name::<T>(),
            actual: value.type_name(),
        })
}

/// Downcast an owned erased value into its typed form.
pub(crate) fn downcast_owned<T>(value: Box<dyn ErasedValue>) -> Result<T, Mismatch>
where
    T: 'static,
{
    let actual = value.type_name();
    value
        .into_any()
        .downcast::<T>()
        .map(|typed| *typed)
        .map_err(|_| Mismatch {
            expected: type_name::<T>(),
            actual,
        })
}
