//! Registry trait for self-registering implementations.

/// Base trait for implementation registries.
///
/// Each implementation module (storage, remote, notify) provides a `Registry`
/// struct implementing this trait, declaring the name it is referenced by in
/// configuration and the factory that builds it.
pub trait ImplementationRegistry {
	/// The name used in configuration files to reference this implementation.
	///
	/// For example `"file"` for `[storage.implementations.file]` or `"rest"`
	/// for `[remote.implementations.rest]`.
	const NAME: &'static str;

	/// The factory function type this implementation provides.
	type Factory;

	/// Returns the factory function for this implementation.
	fn factory() -> Self::Factory;
}
