use async_trait::async_trait;
use hive_model::{ServiceLabel, ServiceSpec};
use sha2::{Digest, Sha256};
use time::OffsetDateTime;
use tracing::info;

use crate::{
    context::Context,
    engine::EngineError,
    pipeline::{PipelineError, Step},
};

/// Hex characters of the Dockerfile digest carried in the image tag.
const DIGEST_LEN: usize = 12;

/// Apply `deploy.image` and build `deploy.Dockerfile` inline.
///
/// A built image is tagged `hive/<name>:<utc timestamp>-<digest>` and written
/// back to the `deploy.image` label. The build is skipped while that label
/// already carries the digest of the current Dockerfile.
pub struct DeployDirective;

#[async_trait]
impl Step for DeployDirective {
    fn name(&self) -> &'static str {
        "deploy-directive"
    }

    fn required(&self) -> bool {
        true
    }

    fn applies(&self, spec: &ServiceSpec) -> bool {
        spec.label(&ServiceLabel::DeployImage).is_some()
            || spec.label(&ServiceLabel::DeployDockerfile).is_some()
    }

    async fn apply(&self, spec: &mut ServiceSpec, ctx: &Context) -> Result<(), PipelineError> {
        if let Some(dockerfile) = spec.label(&ServiceLabel::DeployDockerfile).map(str::to_string) {
            let digest = dockerfile_digest(&dockerfile);
            let built = spec
                .label(&ServiceLabel::DeployImage)
                .is_some_and(|img| img.ends_with(&format!("-{digest}")));

            if !built {
                let tag = image_tag(&spec.name, OffsetDateTime::now_utc(), &digest);
                let context = build_context(&dockerfile)?;
                ctx.engine()
                    .build_image(&tag, context)
                    .await
                    .map_err(|e| match e {
                        EngineError::Build(msg) => PipelineError::Build(msg),
                        other => PipelineError::Build(other.to_string()),
                    })?;
                info!(service = %spec.name, tag = %tag, "inline image built");
                spec.set_label(&ServiceLabel::DeployImage, tag);
            }
        }

        if let Some(image) = spec.label(&ServiceLabel::DeployImage).map(str::to_string) {
            spec.container_mut().image = Some(image);
        }
        Ok(())
    }
}

fn dockerfile_digest(dockerfile: &str) -> String {
    let mut hex = hex::encode(Sha256::digest(dockerfile.as_bytes()));
    hex.truncate(DIGEST_LEN);
    hex
}

fn image_tag(service: &str, at: OffsetDateTime, digest: &str) -> String {
    format!(
        "hive/{}:{:04}{:02}{:02}{:02}{:02}{:02}-{digest}",
        service.to_ascii_lowercase(),
        at.year(),
        at.month() as u8,
        at.day(),
        at.hour(),
        at.minute(),
        at.second(),
    )
}

/// Tar archive holding a single `Dockerfile`.
fn build_context(dockerfile: &str) -> Result<Vec<u8>, PipelineError> {
    let mut header = tar::Header::new_gnu();
    header.set_size(dockerfile.len() as u64);
    header.set_mode(0o644);

    let packing = |e: std::io::Error| PipelineError::Build(format!("packing build context: {e}"));
    let mut archive = tar::Builder::new(Vec::new());
    archive
        .append_data(&mut header, "Dockerfile", dockerfile.as_bytes())
        .map_err(packing)?;
    archive.into_inner().map_err(packing)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::FakeEngine;
    use std::{io::Read, sync::Arc};

    const DOCKERFILE: &str = "FROM alpine:3.20\nCMD [\"echo\", \"hi\"]\n";

    #[test]
    fn tag_is_lowercase_timestamped_and_digested() {
        let at = OffsetDateTime::from_unix_timestamp(1_700_000_000).unwrap();
        let tag = image_tag("My-App", at, "abcdef012345");
        assert_eq!(tag, "hive/my-app:20231114221320-abcdef012345");
    }

    #[test]
    fn context_contains_only_the_dockerfile() {
        let bytes = build_context(DOCKERFILE).unwrap();
        let mut archive = tar::Archive::new(bytes.as_slice());
        let mut entries = archive.entries().unwrap();

        let mut entry = entries.next().unwrap().unwrap();
        assert_eq!(entry.path().unwrap().to_str(), Some("Dockerfile"));
        let mut body = String::new();
        entry.read_to_string(&mut body).unwrap();
        assert_eq!(body, DOCKERFILE);
        drop(entry);

        assert!(entries.next().is_none());
    }

    #[tokio::test]
    async fn image_label_overrides_container_image() {
        let ctx = Context::with_engine(Arc::new(FakeEngine::new()));
        let mut spec = ServiceSpec::named("web").with_label(&ServiceLabel::DeployImage, "nginx:1.27");
        spec.container_mut().image = Some("nginx:1.25".into());

        DeployDirective.apply(&mut spec, &ctx).await.unwrap();
        assert_eq!(spec.image(), Some("nginx:1.27"));
    }

    #[tokio::test]
    async fn dockerfile_is_built_once() {
        let engine = Arc::new(FakeEngine::new());
        let ctx = Context::with_engine(engine.clone());
        let mut spec =
            ServiceSpec::named("Api").with_label(&ServiceLabel::DeployDockerfile, DOCKERFILE);

        DeployDirective.apply(&mut spec, &ctx).await.unwrap();
        let image = spec.label(&ServiceLabel::DeployImage).unwrap().to_string();
        assert!(image.starts_with("hive/api:"));
        assert!(image.ends_with(&dockerfile_digest(DOCKERFILE)));
        assert_eq!(spec.image(), Some(image.as_str()));
        assert_eq!(engine.builds(), vec![image.clone()]);
        assert!(engine.last_build_context().is_some());

        DeployDirective.apply(&mut spec, &ctx).await.unwrap();
        assert_eq!(engine.builds().len(), 1);
        assert_eq!(spec.image(), Some(image.as_str()));
    }

    #[tokio::test]
    async fn failed_build_is_a_hard_error() {
        let engine = Arc::new(FakeEngine::new());
        engine.fail_builds("pull access denied");
        let ctx = Context::with_engine(engine);
        let mut spec =
            ServiceSpec::named("api").with_label(&ServiceLabel::DeployDockerfile, "FROM nope");

        let err = DeployDirective.apply(&mut spec, &ctx).await.unwrap_err();
        assert!(matches!(err, PipelineError::Build(ref m) if m == "pull access denied"));
        assert_eq!(spec.label(&ServiceLabel::DeployImage), None);
        assert!(DeployDirective.required());
    }
}
