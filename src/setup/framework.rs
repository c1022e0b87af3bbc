//! Setup for [poise::Framework]

use crate::commands;
use crate::data::TrackingStore;
use crate::lib::mangadex::MangaDex;
use crate::lib::schedule;
use crate::lib::schedule::DailyCheck;
use crate::lib::updates::Tracker;
use crate::serenity;
use crate::BotError;
use crate::Config;
use crate::Data;

/// Convenient type alias, only this [poise::Framework] type is used.
type Framework = poise::Framework<Data, BotError>;

/// Construct a [poise::Framework]
pub(super) fn framework(config: Config, http: reqwest::Client) -> Framework {
    poise::Framework::builder()
        .options(framework_options())
        .setup(|ctx, rdy, fw| framework_setup(ctx, rdy, fw, config, http))
        .build()
}

/// Configure options for the [Framework]
fn framework_options() -> poise::FrameworkOptions<Data, BotError> {
    poise::FrameworkOptions {
        // Add commands to the framework
        commands: commands::list(),
        // Handle framework errors
        on_error: |e| crate::log::handle_framework_error(e),
        // Log when commands start
        pre_command: |ctx| {
            Box::pin(async move {
                let cmd_name = &ctx.command().name;
                let user = &ctx.author().name;
                tracing::info!("Started '{cmd_name}' command from {user}.")
            })
        },
        // Log when finishing commands
        post_command: |ctx| {
            Box::pin(async move {
                let cmd_name = &ctx.command().name;
                let user = &ctx.author().name;
                tracing::info!("Finished '{cmd_name}' command from {user}.")
            })
        },
        ..Default::default()
    }
}

/// Construct future that runs on startup
fn framework_setup<'a>(
    ctx: &'a serenity::Context,
    rdy: &'a serenity::Ready,
    fw: &'a Framework,
    config: Config,
    http: reqwest::Client,
) -> poise::BoxFuture<'a, Result<Data, BotError>> {
    Box::pin(async move {
        // Register the commands
        let app_commands = poise::builtins::create_application_commands(&fw.options().commands);

        serenity::Command::set_global_commands(&ctx, app_commands.clone()).await?;
        if let Some(dev_guild) = config.dev_guild() {
            // This is faster than global registers, useful for development.
            tracing::info!("Registering commands on dev guild.");
            dev_guild.set_commands(ctx, app_commands).await?;
        }

        let mangadex = MangaDex::builder()
            .client(http)
            .api_url(config.mangadex_api_url())
            .site_url(config.mangadex_site_url())
            .language(config.mangadex_language())
            .maybe_token(config.mangadex_token())
            .build();
        let store = TrackingStore::open(config.data_dir()).await?;
        let tracker = Tracker::new(store, mangadex);
        let list_mode = config.list_mode();

        if let Some(cron) = config.schedule() {
            let check = DailyCheck {
                tracker: tracker.clone(),
                list_mode,
                channel: config.update_channel(),
            };
            schedule::start(cron, ctx.http.clone(), check).await?;
        }

        // Simple message that logs when the bot has initialized
        let bot_name = &rdy.user.name;
        tracing::info!("{bot_name} is ready! Tracking lists are {list_mode:?}.");

        Ok(Data {
            notify_list: config.notify_list(fw),
            tracker,
            list_mode,
        })
    })
}
