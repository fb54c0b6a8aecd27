//! A replaceable constructor for storage backend clients.
//!
//! A [`ClientFactory`] builds a client `C` from connection information `I`.
//! Tests can install an override constructor to substitute a fake client, and the override is removed again when the returned [`OverrideHandle`] is dropped.
//!
//! The factory is an ordinary value: it is passed to the components that need it rather than stored in global state, so independent factories never see each other's overrides.
//!
//! ### Example
//! ```rust
//! # use named_locks::client_factory::{ClientFactory, ClientFactoryError};
//! let factory = ClientFactory::new(|address: &String| {
//!     Err::<String, _>(ClientFactoryError::Connection(format!("{address} is unreachable")))
//! });
//! assert!(factory.create(&"10.0.0.1".to_string()).is_err());
//!
//! let handle = factory.install_override(|address: &String| Ok(format!("fake client for {address}")));
//! assert_eq!(factory.create(&"10.0.0.1".to_string())?, "fake client for 10.0.0.1");
//!
//! drop(handle);
//! assert!(factory.create(&"10.0.0.1".to_string()).is_err());
//! # Ok::<(), ClientFactoryError>(())
//! ```

use std::sync::{Arc, Weak};

use parking_lot::RwLock;
use thiserror::Error;

/// A client constructor.
pub type ClientConstructor<I, C> = Arc<dyn Fn(&I) -> Result<C, ClientFactoryError> + Send + Sync>;

type OverrideSlot<I, C> = RwLock<Option<ClientConstructor<I, C>>>;

/// A client factory error.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ClientFactoryError {
    /// An override constructor is already installed.
    #[error("a client constructor override is already installed")]
    OverrideAlreadyInstalled,
    /// The client could not connect to the backend.
    #[error("connection error: {0}")]
    Connection(String),
    /// The connection information is invalid.
    #[error("configuration error: {0}")]
    Configuration(String),
}

/// A client factory with an optional override constructor.
pub struct ClientFactory<I, C> {
    default: ClientConstructor<I, C>,
    override_slot: Arc<OverrideSlot<I, C>>,
}

impl<I, C> core::fmt::Debug for ClientFactory<I, C> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("ClientFactory")
            .field("overridden", &self.override_slot.read().is_some())
            .finish_non_exhaustive()
    }
}

impl<I, C> Clone for ClientFactory<I, C> {
    fn clone(&self) -> Self {
        Self {
            default: self.default.clone(),
            override_slot: self.override_slot.clone(),
        }
    }
}

impl<I: 'static, C: 'static> ClientFactory<I, C> {
    /// Create a new client factory with a `default` constructor.
    pub fn new(
        default: impl Fn(&I) -> Result<C, ClientFactoryError> + Send + Sync + 'static,
    ) -> Self {
        Self {
            default: Arc::new(default),
            override_slot: Arc::new(RwLock::new(None)),
        }
    }

    /// Install an override constructor.
    ///
    /// Clones of this factory share the override.
    ///
    /// # Panics
    /// Panics if an override is already installed.
    /// Installing two overrides is a programming error in the test harness.
    pub fn install_override(
        &self,
        constructor: impl Fn(&I) -> Result<C, ClientFactoryError> + Send + Sync + 'static,
    ) -> OverrideHandle<I, C> {
        match self.try_install_override(constructor) {
            Ok(handle) => handle,
            Err(err) => panic!("{err}"),
        }
    }

    /// Install an override constructor.
    ///
    /// # Errors
    /// Returns [`ClientFactoryError::OverrideAlreadyInstalled`] if an override is already installed.
    pub fn try_install_override(
        &self,
        constructor: impl Fn(&I) -> Result<C, ClientFactoryError> + Send + Sync + 'static,
    ) -> Result<OverrideHandle<I, C>, ClientFactoryError> {
        let mut slot = self.override_slot.write();
        if slot.is_some() {
            return Err(ClientFactoryError::OverrideAlreadyInstalled);
        }
        let constructor: ClientConstructor<I, C> = Arc::new(constructor);
        *slot = Some(constructor);
        Ok(OverrideHandle {
            slot: Arc::downgrade(&self.override_slot),
        })
    }

    /// Returns true if an override constructor is installed.
    #[must_use]
    pub fn is_overridden(&self) -> bool {
        self.override_slot.read().is_some()
    }

    /// Create a client, using the override constructor if one is installed.
    ///
    /// # Errors
    /// Returns the error of the constructor, typically a [`ClientFactoryError::Connection`] or [`ClientFactoryError::Configuration`] error.
    pub fn create(&self, info: &I) -> Result<C, ClientFactoryError> {
        let constructor = self
            .override_slot
            .read()
            .clone()
            .unwrap_or_else(|| self.default.clone());
        constructor(info)
    }
}

/// A handle to an installed override constructor.
///
/// The override is removed when the handle is dropped.
#[must_use = "if unused the override is removed immediately"]
pub struct OverrideHandle<I, C> {
    slot: Weak<OverrideSlot<I, C>>,
}

impl<I, C> core::fmt::Debug for OverrideHandle<I, C> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        writeln!(f, "override handle")
    }
}

impl<I, C> OverrideHandle<I, C> {
    /// Remove the override constructor.
    pub fn uninstall(self) {}
}

impl<I, C> Drop for OverrideHandle<I, C> {
    fn drop(&mut self) {
        if let Some(slot) = self.slot.upgrade() {
            *slot.write() = None;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, PartialEq)]
    struct Client(&'static str);

    fn factory() -> ClientFactory<u16, Client> {
        ClientFactory::new(|port: &u16| {
            if *port == 0 {
                Err(ClientFactoryError::Configuration("port must be non-zero".into()))
            } else {
                Ok(Client("real"))
            }
        })
    }

    #[test]
    fn client_factory_default() {
        let factory = factory();
        assert!(!factory.is_overridden());
        assert_eq!(factory.create(&8440), Ok(Client("real")));
        assert!(matches!(
            factory.create(&0),
            Err(ClientFactoryError::Configuration(_))
        ));
    }

    #[test]
    fn client_factory_override_teardown() {
        let factory = factory();
        let handle = factory.install_override(|_: &u16| Ok(Client("fake")));
        assert!(factory.is_overridden());
        assert_eq!(factory.create(&0), Ok(Client("fake")));
        assert_eq!(factory.clone().create(&8440), Ok(Client("fake")));
        handle.uninstall();
        assert!(!factory.is_overridden());
        assert_eq!(factory.create(&8440), Ok(Client("real")));

        // Reinstalling after teardown is allowed.
        let _handle = factory.install_override(|_: &u16| Ok(Client("fake again")));
        assert_eq!(factory.create(&8440), Ok(Client("fake again")));
    }

    #[test]
    fn client_factory_double_install() {
        let factory = factory();
        let _handle = factory.install_override(|_: &u16| Ok(Client("fake")));
        assert_eq!(
            factory
                .try_install_override(|_: &u16| Ok(Client("other")))
                .unwrap_err(),
            ClientFactoryError::OverrideAlreadyInstalled
        );
        assert_eq!(factory.create(&8440), Ok(Client("fake")));
    }

    #[test]
    #[should_panic(expected = "already installed")]
    fn client_factory_double_install_panics() {
        let factory = factory();
        let _first = factory.install_override(|_: &u16| Ok(Client("fake")));
        let _second = factory.install_override(|_: &u16| Ok(Client("other")));
    }

    #[test]
    fn client_factory_debug() {
        let factory = factory();
        assert_eq!(
            format!("{factory:?}"),
            "ClientFactory { overridden: false, .. }"
        );
        let _handle = factory.install_override(|_: &u16| Ok(Client("fake")));
        assert_eq!(
            format!("{factory:?}"),
            "ClientFactory { overridden: true, .. }"
        );
    }

    #[test]
    fn client_factory_independent() {
        let a = factory();
        let b = factory();
        let _handle = a.install_override(|_: &u16| Ok(Client("fake")));
        assert_eq!(b.create(&8440), Ok(Client("real")));
    }
}
