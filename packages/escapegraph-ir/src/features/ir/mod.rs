/// IR Feature
///
/// Input model consumed by the escape analysis: functions with their
/// declared-in lists, statement and expression trees, allocation sites.
///
/// ## Architecture
/// - **ids**: dense handles (`FuncId`, `VarId`, `SiteId`, `LabelId`, `Site`)
/// - **node**: closed `Stmt` / `Expr` enums
/// - **program**: declaration tables and nesting queries
/// - **builder**: `ProgramBuilder`, the only way to assemble a `Program`
/// - **visit**: read-only traversal
pub mod builder;
pub mod ids;
pub mod node;
pub mod program;
pub mod visit;

pub use builder::ProgramBuilder;
pub use ids::{FuncId, LabelId, Site, SiteId, VarId};
pub use node::{AllocKind, CompositeKind, Expr, IndexKind, Literal, Stmt};
pub use program::{FunctionDecl, Program, SiteInfo, VarClass, VarDecl};
pub use visit::Visitor;
