use hive_core::prelude::*;

/// Everything the HTTP handlers share.
pub struct PanelState {
    ctx: Context,
    pipeline: Pipeline,
    auth: AuthGateway,
    bootstrap: ClusterBootstrap,
    hook: DeployHook,
}

impl PanelState {
    /// State running the standard pipeline.
    pub fn new(ctx: Context) -> Self {
        Self::with_pipeline(ctx, Pipeline::standard())
    }

    pub fn with_pipeline(ctx: Context, pipeline: Pipeline) -> Self {
        Self {
            auth: AuthGateway::new(ctx.clone()),
            bootstrap: ClusterBootstrap::new(ctx.clone()),
            hook: DeployHook::new(ctx.clone()),
            pipeline,
            ctx,
        }
    }

    pub fn ctx(&self) -> &Context {
        &self.ctx
    }

    pub fn pipeline(&self) -> &Pipeline {
        &self.pipeline
    }

    pub fn auth(&self) -> &AuthGateway {
        &self.auth
    }

    pub fn bootstrap(&self) -> &ClusterBootstrap {
        &self.bootstrap
    }

    pub fn hook(&self) -> &DeployHook {
        &self.hook
    }
}
