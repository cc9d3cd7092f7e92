use pkgcheck_runtime::{RuntimeError, VirtualEnv};
use tracing::{debug, warn};

/// A resource the pipeline acquired and must give back.
pub trait Release {
    fn label(&self) -> String;

    fn release(&mut self) -> Result<(), RuntimeError>;
}

impl Release for VirtualEnv {
    fn label(&self) -> String {
        format!("{} environment", VirtualEnv::label(self))
    }

    fn release(&mut self) -> Result<(), RuntimeError> {
        self.exit()
    }
}

/// Resources in acquisition order, released last-in first-out.
#[derive(Default)]
pub struct ReleaseStack {
    items: Vec<Box<dyn Release>>,
}

impl ReleaseStack {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, item: Box<dyn Release>) {
        debug!("acquired {}", item.label());
        self.items.push(item);
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Labels in acquisition order.
    pub fn labels(&self) -> Vec<String> {
        self.items.iter().map(|i| i.label()).collect()
    }

    /// Release everything, newest first. Keeps going after a failure and
    /// reports the first one.
    pub fn release_all(&mut self) -> Result<(), RuntimeError> {
        let mut first_err = None;
        while let Some(mut item) = self.items.pop() {
            let label = item.label();
            debug!("releasing {label}");
            if let Err(e) = item.release() {
                warn!("failed to release {label}: {e}");
                first_err.get_or_insert(e);
            }
        }
        first_err.map_or(Ok(()), Err)
    }
}

impl Drop for ReleaseStack {
    fn drop(&mut self) {
        let _ = self.release_all();
    }
}
