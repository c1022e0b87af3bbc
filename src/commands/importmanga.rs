//! Implements the `/importmanga` command.
//!
//! Merges a JSON array of manga ids (as written by `/exportmanga`) into the
//! author's tracking list. Ids already tracked are kept once.

use tracing::instrument;

use crate::data::GetData;
use crate::data::MangaId;
use crate::error::UserError;
use crate::serenity;
use crate::BotError;
use crate::Context;

/// Anything bigger is not a tracking list.
const MAX_IMPORT_BYTES: u32 = 1024 * 1024;

/// Import a new manga tracking list from a file.
#[instrument(skip(ctx, file), fields(file = %file.filename))]
#[poise::command(slash_command, ephemeral)]
pub async fn importmanga(
    ctx: Context<'_>,
    #[description = "The JSON file to import."] file: serenity::Attachment,
) -> Result<(), BotError> {
    if !file.filename.ends_with(".json") {
        return Err(UserError::NotJsonFile.into());
    }
    if file.size > MAX_IMPORT_BYTES {
        return Err(UserError::ImportTooLarge { size: file.size }.into());
    }

    let client = ctx.http_client();
    let body = download(&client, &file.url)
        .await
        .map_err(|e| UserError::ImportFailed {
            reason: e.to_string(),
        })?;
    let ids = parse_import(&body)?;

    let added = ctx
        .data()
        .tracker
        .store()
        .import(&ctx.list_key(), ids)
        .await?;
    tracing::info!("Imported {added} new manga.");

    ctx.say("Your manga tracking list has been successfully imported!")
        .await?;
    Ok(())
}

/// Fetch the attachment's content.
async fn download(client: &reqwest::Client, url: &str) -> Result<Vec<u8>, reqwest::Error> {
    let response = client.get(url).send().await?.error_for_status()?;
    Ok(response.bytes().await?.to_vec())
}

/// The file must be a JSON array of strings.
fn parse_import(body: &[u8]) -> Result<Vec<MangaId>, UserError> {
    let mut de = serde_json::Deserializer::from_slice(body);
    serde_path_to_error::deserialize(&mut de).map_err(|e| UserError::InvalidImportFormat {
        reason: e.to_string(),
    })
}
