//! 测试工具：内存仓储与实体构建器

pub mod builders;
pub mod mocks;

pub use builders::*;
pub use mocks::*;
