//! Query building for searchable models.
//!
//! This module turns structured predicates into the Lucene-style grammar the
//! search backend accepts.
//!
//! # Architecture
//!
//! - **Value**: right-hand side of a restriction (`SearchValue`)
//! - **Predicate**: ordered field → value mapping (`Predicate`)
//! - **Compiler**: pure predicate → fragment functions
//! - **Select**: the unbound selector/options builder (`SearchQuery`)
//!
//! # Examples
//!
//! ```
//! use lifeguard_search::SearchQuery;
//!
//! let query = SearchQuery::new()
//!     .filter(("tags", "x"))
//!     .gt(("price", 10))
//!     .limit(5);
//!
//! assert_eq!(query.selector(), "(tags:x) AND ((price:{10 TO *}))");
//! assert_eq!(query.options().rows, Some(5));
//! ```

pub mod compiler;
#[doc(inline)]
pub use compiler::{Bounds, Operator};

pub mod predicate;
#[doc(inline)]
pub use predicate::Predicate;

pub mod select;
#[doc(inline)]
pub use select::{Clause, IntoPredicates, QueryOptions, SearchQuery, SortDirection, SortSpec};

pub mod value;
#[doc(inline)]
pub use value::{SearchValue, UNBOUNDED_MAX, UNBOUNDED_MIN};
