//! Line commands understood by the shell, and their execution.

use anyhow::{anyhow, bail, Context};
use domains::{Post, Result as LetterboxResult, ThreadId};
use services::Letterbox;

pub const HELP: &str = "\
threads                              list threads, most recently active first
roots                                list opening posts only, newest first
show <ts> <op>                       print a thread
dump <ts> <op>                       print a thread as JSON
new <content>                        open a thread (\\n for newlines)
reply <ts> <op> <content>            reply to a thread
edit <ts> <op> <index> <content>     edit a post (0 = root, n = nth reply)
read <ts> <op> [up_to]               mark read, up to the last post by default
reply-draft <ts> <op> [content]      show or set your reply draft
clear-reply-draft <ts> <op>          clear your reply draft
draft <content>                      save a new thread draft
set-draft <id> <content>             overwrite a thread draft
drafts                               list your thread drafts
show-draft <id>                      print a thread draft
clear-draft <id>                     clear a thread draft
help | quit";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Threads,
    Roots,
    Show(ThreadId),
    Dump(ThreadId),
    New(String),
    Reply(ThreadId, String),
    Edit {
        thread: ThreadId,
        index: usize,
        content: String,
    },
    Read {
        thread: ThreadId,
        up_to: Option<i64>,
    },
    ReplyDraft {
        thread: ThreadId,
        content: Option<String>,
    },
    ClearReplyDraft(ThreadId),
    NewDraft(String),
    SetDraft {
        id: String,
        content: String,
    },
    Drafts,
    ShowDraft(String),
    ClearDraft(String),
    Help,
    Quit,
}

/// Splits off the first whitespace-delimited word.
fn next_word(input: &str) -> (&str, &str) {
    let input = input.trim_start();
    match input.split_once(char::is_whitespace) {
        Some((word, rest)) => (word, rest.trim_start()),
        None => (input, ""),
    }
}

fn thread_arg(input: &str) -> anyhow::Result<(ThreadId, &str)> {
    let (ts, rest) = next_word(input);
    let (op, rest) = next_word(rest);
    if op.is_empty() {
        bail!("expected <ts> <op>");
    }
    let ts = ts.parse().with_context(|| format!("bad timestamp {ts:?}"))?;
    Ok((ThreadId::new(ts, op), rest))
}

fn content_arg(rest: &str) -> anyhow::Result<String> {
    if rest.is_empty() {
        bail!("expected <content>");
    }
    Ok(rest.replace("\\n", "\n"))
}

pub fn parse(line: &str) -> anyhow::Result<Command> {
    let (verb, rest) = next_word(line);
    let command = match verb {
        "threads" => Command::Threads,
        "roots" => Command::Roots,
        "show" => Command::Show(thread_arg(rest)?.0),
        "dump" => Command::Dump(thread_arg(rest)?.0),
        "new" => Command::New(content_arg(rest)?),
        "reply" => {
            let (thread, rest) = thread_arg(rest)?;
            Command::Reply(thread, content_arg(rest)?)
        }
        "edit" => {
            let (thread, rest) = thread_arg(rest)?;
            let (index, rest) = next_word(rest);
            let index = index
                .parse()
                .with_context(|| format!("bad post index {index:?}"))?;
            Command::Edit {
                thread,
                index,
                content: content_arg(rest)?,
            }
        }
        "read" => {
            let (thread, rest) = thread_arg(rest)?;
            let up_to = match next_word(rest).0 {
                "" => None,
                ts => Some(ts.parse().with_context(|| format!("bad timestamp {ts:?}"))?),
            };
            Command::Read { thread, up_to }
        }
        "reply-draft" => {
            let (thread, rest) = thread_arg(rest)?;
            let content = (!rest.is_empty()).then(|| rest.replace("\\n", "\n"));
            Command::ReplyDraft { thread, content }
        }
        "clear-reply-draft" => Command::ClearReplyDraft(thread_arg(rest)?.0),
        "draft" => Command::NewDraft(content_arg(rest)?),
        "set-draft" => {
            let (id, rest) = next_word(rest);
            if id.is_empty() {
                bail!("expected <id>");
            }
            Command::SetDraft {
                id: id.to_string(),
                content: content_arg(rest)?,
            }
        }
        "drafts" => Command::Drafts,
        "show-draft" | "clear-draft" => {
            let (id, _) = next_word(rest);
            if id.is_empty() {
                bail!("expected <id>");
            }
            if verb == "show-draft" {
                Command::ShowDraft(id.to_string())
            } else {
                Command::ClearDraft(id.to_string())
            }
        }
        "help" => Command::Help,
        "quit" | "exit" => Command::Quit,
        other => bail!("unknown command {other:?}; try `help`"),
    };
    Ok(command)
}

/// `*` unread, blank read, `?` when read state is unavailable (no
/// identity, or an unparsable marker).
fn unread_marker(state: LetterboxResult<bool>) -> &'static str {
    match state {
        Ok(true) => "*",
        Ok(false) => " ",
        Err(_) => "?",
    }
}

fn print_post(index: usize, post: &Post, marker: &str) {
    println!(
        "{marker}[{index}] {} {} ({})",
        post.timestamp_micros(),
        post.doc.author,
        post.first_posted.format("%Y-%m-%d %H:%M:%S")
    );
    for line in post.doc.content.lines() {
        println!("      {line}");
    }
}

pub async fn run(letterbox: &Letterbox, command: Command) -> anyhow::Result<()> {
    match command {
        Command::Threads => {
            for thread in letterbox.get_threads().await? {
                let id = letterbox.thread_id(&thread)?;
                let marker = unread_marker(letterbox.thread_has_unread_posts(&thread).await);
                let title = letterbox.get_thread_title(&thread).unwrap_or_else(|| {
                    thread.root.doc.content.lines().next().unwrap_or_default().to_string()
                });
                println!(
                    "{marker} {} {title} ({} replies)",
                    id.to_string().replacen("--", " ", 1),
                    thread.replies.len()
                );
            }
        }
        Command::Roots => {
            for root in letterbox.get_thread_roots().await? {
                let first_line = root.doc.content.lines().next().unwrap_or_default();
                println!("{} {} {first_line}", root.timestamp_micros(), root.doc.author);
            }
        }
        Command::Show(id) => {
            let thread = letterbox
                .get_thread(&id)
                .await?
                .ok_or_else(|| anyhow!("no thread {id}"))?;
            for (index, post) in thread.posts().enumerate() {
                let marker = unread_marker(letterbox.is_unread(post).await);
                print_post(index, post, marker);
            }
        }
        Command::Dump(id) => {
            let thread = letterbox
                .get_thread(&id)
                .await?
                .ok_or_else(|| anyhow!("no thread {id}"))?;
            println!("{}", serde_json::to_string_pretty(&thread)?);
        }
        Command::New(content) => {
            let thread = letterbox.create_thread(&content, None).await?;
            let id = letterbox.thread_id(&thread)?;
            println!("created {} {}", id.root_timestamp, id.op);
        }
        Command::Reply(id, content) => {
            let post = letterbox.create_reply(&id, &content, None).await?;
            println!("replied at {}", post.timestamp_micros());
        }
        Command::Edit {
            thread,
            index,
            content,
        } => {
            let thread = letterbox
                .get_thread(&thread)
                .await?
                .ok_or_else(|| anyhow!("no thread {thread}"))?;
            let post = thread
                .posts()
                .nth(index)
                .ok_or_else(|| anyhow!("no post at index {index}"))?;
            letterbox.edit_post(post, &content).await?;
            println!("edited");
        }
        Command::Read { thread, up_to } => {
            let up_to = match up_to {
                Some(ts) => ts,
                None => letterbox
                    .get_thread(&thread)
                    .await?
                    .ok_or_else(|| anyhow!("no thread {thread}"))?
                    .last_item()
                    .timestamp_micros(),
            };
            letterbox.mark_read_up_to(&thread, up_to).await?;
            println!("read up to {up_to}");
        }
        Command::ReplyDraft { thread, content } => match content {
            Some(content) => {
                letterbox.set_reply_draft(&thread, &content).await?;
                println!("saved");
            }
            None => match letterbox.get_reply_draft(&thread).await? {
                Some(draft) if !draft.is_empty() => println!("{draft}"),
                _ => println!("(no draft)"),
            },
        },
        Command::ClearReplyDraft(thread) => {
            letterbox.clear_reply_draft(&thread).await?;
            println!("cleared");
        }
        Command::NewDraft(content) => {
            let id = letterbox.set_thread_root_draft(&content, None).await?;
            println!("draft {id}");
        }
        Command::SetDraft { id, content } => {
            letterbox.set_thread_root_draft(&content, Some(&id)).await?;
            println!("draft {id}");
        }
        Command::Drafts => {
            for id in letterbox.get_thread_root_draft_ids().await? {
                match letterbox.get_draft_thread_parts(&id).await? {
                    Some(parts) => println!("{id} {}", parts.title),
                    None => println!("{id} (untitled)"),
                }
            }
        }
        Command::ShowDraft(id) => match letterbox.get_thread_root_draft_content(&id).await? {
            Some(content) => println!("{content}"),
            None => println!("(no draft {id})"),
        },
        Command::ClearDraft(id) => {
            letterbox.clear_thread_root_draft(&id).await?;
            println!("cleared");
        }
        Command::Help => println!("{HELP}"),
        Command::Quit => {}
    }
    Ok(())
}
