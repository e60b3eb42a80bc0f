//! Line-based driver: `/start`, `/help` and `/cancel` are commands, `!data`
//! presses the button with callback `data`, `@path` sends the file at `path`,
//! anything else is a text message.

use std::path::Path;

use menugen_bot::backend::HttpBackend;
use menugen_bot::fsm::Event;
use menugen_bot::{Config, Dialogue, Reply};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};

use super::BoxError;

pub async fn main(user_id: i64) -> Result<(), BoxError> {
    let config = Config::from_env()?;
    let backend = HttpBackend::new(&config.api_url, config.http_timeout)?;
    let dialogue = Dialogue::new(backend);

    let mut stdout = tokio::io::stdout();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    stdout.write_all(render(&dialogue.handle(user_id, Event::Start).await).as_bytes()).await?;
    while let Some(line) = lines.next_line().await? {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let event = match parse_line(line).await {
            Ok(event) => event,
            Err(message) => {
                stdout.write_all(format!("{message}\n").as_bytes()).await?;
                continue;
            }
        };
        let reply = dialogue.handle(user_id, event).await;
        stdout.write_all(render(&reply).as_bytes()).await?;
        stdout.flush().await?;
    }

    Ok(())
}

async fn parse_line(line: &str) -> Result<Event, String> {
    if let Some(data) = line.strip_prefix('!') {
        return Event::from_callback(data).ok_or_else(|| format!("unknown button: {data}"));
    }
    if let Some(path) = line.strip_prefix('@') {
        let path = Path::new(path.trim());
        let bytes = tokio::fs::read(path)
            .await
            .map_err(|e| format!("cannot read {}: {e}", path.display()))?;
        let file_name = path
            .file_name()
            .map(|name| name.to_string_lossy().to_string())
            .ok_or_else(|| format!("{} is not a file", path.display()))?;
        return Ok(Event::Document { file_name, bytes });
    }
    Ok(Event::from_text(line))
}

fn render(reply: &Reply) -> String {
    let mut out = format!("{}\n", reply.text);
    for button in &reply.buttons {
        out.push_str(&format!("  [{}] !{}\n", button.label, button.callback));
    }
    out
}
