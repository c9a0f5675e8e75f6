use std::sync::Arc;

use chat_rules::activity::Address;
use chat_rules::channels::{CliTransport, Transport};
use chat_rules::config::BotConfig;
use chat_rules::pipeline::{
    ActivityRules, BoxRule, Dispatcher, EventMatch, MessageMatch, RegexMatch, filter, first,
    matches_regex, prepend, run, text_is,
};
use chat_rules::prompt::{ChoiceLists, Prompt, Prompter, Responders, responder};
use chat_rules::store::{AppState, BotData, MemoryStore, Promptable, Store};
use regex::Regex;
use tracing::{info, warn};

/// Demo application state: the prompt slot plus what the bot learned.
#[derive(Debug, Clone, Default)]
struct ProfileState {
    bot: BotData,
    name: Option<String>,
    color: Option<String>,
}

#[derive(Debug)]
enum ProfileAction {
    SetName(String),
    SetColor(String),
}

impl Promptable for ProfileState {
    fn prompt_key(&self, conversation_id: &str) -> Option<&str> {
        self.bot.prompt_key(conversation_id)
    }

    fn set_prompt_key(&mut self, conversation_id: &str, prompt_key: Option<String>) {
        self.bot.set_prompt_key(conversation_id, prompt_key);
    }
}

impl AppState for ProfileState {
    type Action = ProfileAction;

    fn reduce(&mut self, action: &ProfileAction) {
        match action {
            ProfileAction::SetName(name) => self.name = Some(name.clone()),
            ProfileAction::SetColor(color) => self.color = Some(color.clone()),
        }
    }
}

type Msg = MessageMatch<ProfileState, BotData>;

fn responders(prompter: &Prompter<ProfileState>) -> Responders {
    let on_name = prompter.clone();
    let on_color = prompter.clone();

    let name = responder(move |address: Address, text: String| {
        let p = on_name.clone();
        async move {
            let name = text.trim().to_string();
            if name.is_empty() {
                return false;
            }
            if let Err(e) = p.dispatch(ProfileAction::SetName(name.clone())).await {
                warn!(error = %e, "Failed to record name");
                return false;
            }
            p.send(&address, format!("Nice to meet you, {name}."))
                .await
                .is_ok()
        }
    });

    let color = prompter.choice_responder("colors", move |address, choice| {
        let p = on_color.clone();
        async move {
            let Some(color) = choice else {
                if let Err(e) = p.send(&address, "Please pick one of the listed colors.").await {
                    warn!(error = %e, "Failed to re-ask for a color");
                }
                return false;
            };
            if let Err(e) = p.dispatch(ProfileAction::SetColor(color.clone())).await {
                warn!(error = %e, "Failed to record color");
                return false;
            }
            p.send(&address, format!("{color} it is.")).await.is_ok()
        }
    });

    Responders::from([
        ("awaitingName".to_string(), name),
        ("awaitingColor".to_string(), color),
    ])
}

fn ask_name(prompt: &Arc<Prompt<ProfileState>>) -> anyhow::Result<BoxRule<Msg>> {
    let prompt = Arc::clone(prompt);
    let rule = prepend(
        matches_regex(Regex::new(r"(?i)^\s*(my\s+)?name\s*$")?),
        run(move |m: RegexMatch<Msg>| {
            let prompt = Arc::clone(&prompt);
            async move {
                prompt
                    .text(&m.address, "awaitingName", "What's your name?")
                    .await?;
                anyhow::Ok(())
            }
        }),
    );
    Ok(rule)
}

fn ask_color(prompt: &Arc<Prompt<ProfileState>>) -> BoxRule<Msg> {
    let prompt = Arc::clone(prompt);
    filter(
        text_is::<Msg>("color"),
        run(move |m: Msg| {
            let prompt = Arc::clone(&prompt);
            async move {
                prompt
                    .choice(&m.address, "awaitingColor", "colors", "Pick a color")
                    .await?;
                anyhow::Ok(())
            }
        }),
    )
}

fn whoami() -> BoxRule<Msg> {
    filter(
        text_is::<Msg>("whoami"),
        run(|m: Msg| async move {
            let name = m.state.name.as_deref().unwrap_or("a stranger");
            let color = m.state.color.as_deref().unwrap_or("no color yet");
            m.reply_async(format!("You are {name}, favorite color: {color}."))
                .await?;
            anyhow::Ok(())
        }),
    )
}

fn echo() -> BoxRule<Msg> {
    run(|m: Msg| async move {
        m.reply_async(format!("You said: {}", m.text)).await?;
        anyhow::Ok(())
    })
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    let config = BotConfig::from_env()?;
    let choice_lists = match &config.choices_path {
        Some(path) => ChoiceLists::from_path(path)?,
        None => ChoiceLists::new().with_list("colors", ["Red", "Blue"]),
    };

    eprintln!("chat-rules v{}", env!("CARGO_PKG_VERSION"));
    eprintln!("   Bot: {}", config.bot_id);
    eprintln!("   Error policy: {}", config.error_policy);
    eprintln!("   Try: name, color, whoami. Ctrl-C to exit.\n");

    let transport: Arc<dyn Transport> = Arc::new(CliTransport::new());
    let store: Arc<dyn Store<ProfileState>> = Arc::new(MemoryStore::new(ProfileState::default()));

    let prompter = Prompter::new(
        Arc::clone(&transport),
        Arc::clone(&store),
        choice_lists,
        config.bot_account(),
    );
    let prompt = Arc::new(Prompt::new(prompter, responders));

    let rules = ActivityRules::new()
        .messages(first([
            prompt.rule(),
            ask_name(&prompt)?,
            ask_color(&prompt),
            whoami(),
            echo(),
        ]))
        .events(run(|m: EventMatch<ProfileState, BotData>| async move {
            info!(name = %m.event.name, "Event received");
            anyhow::Ok(())
        }));

    let dispatcher = Dispatcher::new(
        transport,
        store,
        |s: &ProfileState| s.bot.clone(),
        config.dispatcher_config(),
    );

    let summary = dispatcher
        .run_until(rules, async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                warn!(error = %e, "Failed to listen for Ctrl-C, running until input ends");
                std::future::pending::<()>().await;
            }
        })
        .await?;

    eprintln!(
        "\nHandled {} of {} activities ({} errors)",
        summary.matched, summary.received, summary.errors
    );
    Ok(())
}
