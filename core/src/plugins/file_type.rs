//! Re-detects an artifact's content type from its stored payload

use crate::{
	infrastructure::tasks::{PluginContext, PluginDescriptor, Scope},
	operations::artifacts::content_type,
};

use anyhow::Context;
use tracing::debug;
use uuid::Uuid;

pub const NAME: &str = "file-type";

pub fn descriptor() -> PluginDescriptor {
	PluginDescriptor::new(Scope::Artifact.as_str(), NAME).future(process)
}

async fn process(ctx: PluginContext, uuid: Uuid) -> anyhow::Result<()> {
	let tx = ctx.files.begin(&ctx.db).await?;

	let artifact = ctx.files.get(&tx, uuid).await?;
	let data = ctx
		.files
		.read(&tx, uuid)
		.await
		.with_context(|| format!("failed to read payload of artifact <uuid={uuid}>"))?;

	let detected = content_type::sniff(&data, artifact.file_name.as_deref());
	debug!(%uuid, previous = %artifact.content_type, %detected, "Detected content type");

	ctx.files.set_content_type(&tx, uuid, detected).await?;
	tx.commit().await?;

	Ok(())
}
