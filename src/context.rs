use crate::deployment::{DeploymentManager, GCloudDeploymentManager};
use crate::traits::{
    CommandExecutor, FileSystem, InquireUserInput, Output, RealCommandExecutor, RealFileSystem,
    TerminalOutput, UserInput,
};
use std::sync::Arc;

/// Application context that holds all dependencies for dependency injection
pub struct Context {
    pub fs: Arc<dyn FileSystem>,
    pub input: Arc<dyn UserInput>,
    pub output: Arc<dyn Output>,
    #[allow(dead_code)]
    pub command: Arc<dyn CommandExecutor>,
    pub deployment_manager: Arc<dyn DeploymentManager>,
}

impl Context {
    /// Create a new context with real implementations (for production use)
    pub fn new() -> Self {
        let command: Arc<dyn CommandExecutor> = Arc::new(RealCommandExecutor::new());
        Self {
            fs: Arc::new(RealFileSystem),
            input: Arc::new(InquireUserInput),
            output: Arc::new(TerminalOutput),
            deployment_manager: Arc::new(GCloudDeploymentManager::new(Arc::clone(&command))),
            command,
        }
    }

    /// Create a test context with specific mock implementations
    #[cfg(test)]
    pub fn test_with(
        fs: Arc<dyn FileSystem>,
        input: Arc<dyn UserInput>,
        output: Arc<dyn Output>,
        command: Arc<dyn CommandExecutor>,
        deployment_manager: Arc<dyn DeploymentManager>,
    ) -> Self {
        Self {
            fs,
            input,
            output,
            command,
            deployment_manager,
        }
    }
}

impl Default for Context {
    fn default() -> Self {
        Self::new()
    }
}

impl Clone for Context {
    fn clone(&self) -> Self {
        Self {
            fs: Arc::clone(&self.fs),
            input: Arc::clone(&self.input),
            output: Arc::clone(&self.output),
            command: Arc::clone(&self.command),
            deployment_manager: Arc::clone(&self.deployment_manager),
        }
    }
}
