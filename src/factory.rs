//! Object factory contract used by the pool to manage object lifecycles

use std::error::Error;
use std::fmt;

/// Error type returned by factory callbacks
pub type FactoryError = Box<dyn Error + Send + Sync>;

/// Result type returned by factory callbacks
pub type FactoryResult<T> = Result<T, FactoryError>;

/// Lifecycle callbacks the pool invokes on the objects it manages.
///
/// Only [`make`](ObjectFactory::make) is required. The pool never calls a
/// factory method while holding its internal lock, and the evictor thread
/// calls the same methods as borrowing threads, so implementations must be
/// `Send + Sync`.
///
/// # Examples
///
/// ```
/// use commons_objectpool::{FactoryResult, ObjectFactory};
///
/// struct Connection {
///     open: bool,
/// }
///
/// struct ConnectionFactory;
///
/// impl ObjectFactory<Connection> for ConnectionFactory {
///     fn make(&self) -> FactoryResult<Connection> {
///         Ok(Connection { open: true })
///     }
///
///     fn validate(&self, conn: &Connection) -> bool {
///         conn.open
///     }
/// }
/// ```
pub trait ObjectFactory<T>: Send + Sync {
    /// Create a new instance
    fn make(&self) -> FactoryResult<T>;

    /// Release the resources held by an instance that leaves the pool
    fn destroy(&self, obj: T) -> FactoryResult<()> {
        drop(obj);
        Ok(())
    }

    /// Check whether an instance is still usable
    fn validate(&self, _obj: &T) -> bool {
        true
    }

    /// Prepare an idle instance for a borrower
    fn activate(&self, _obj: &mut T) -> FactoryResult<()> {
        Ok(())
    }

    /// Reset an instance that is going back to the idle set
    fn passivate(&self, _obj: &mut T) -> FactoryResult<()> {
        Ok(())
    }
}

/// Factory built from a single creation closure.
///
/// ```
/// use commons_objectpool::{FnFactory, ObjectFactory};
///
/// let factory = FnFactory::new(|| Ok(String::from("buffer")));
/// assert_eq!(factory.make().unwrap(), "buffer");
/// ```
pub struct FnFactory<F> {
    make_fn: F,
}

impl<F> FnFactory<F> {
    pub fn new<T>(make_fn: F) -> Self
    where
        F: Fn() -> FactoryResult<T> + Send + Sync,
    {
        Self { make_fn }
    }
}

impl<T, F> ObjectFactory<T> for FnFactory<F>
where
    F: Fn() -> FactoryResult<T> + Send + Sync,
{
    fn make(&self) -> FactoryResult<T> {
        (self.make_fn)()
    }
}

impl<F> fmt::Debug for FnFactory<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnFactory").finish_non_exhaustive()
    }
}
