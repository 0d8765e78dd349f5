#[cfg(windows)]
pub mod com;
pub mod unsupported;

#[cfg(windows)]
pub use com::EnterpriseGuideHost;
pub use unsupported::UnsupportedHost;
