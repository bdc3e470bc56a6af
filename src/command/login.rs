// SPDX-FileCopyrightText: 2024 Noah Fontes
//
// SPDX-License-Identifier: Apache-2.0

use std::{
    io::{self, BufRead as _, Write as _},
    sync::Arc,
};

use async_trait::async_trait;
use clap::Parser;
use log::{error, info};
use tokio::task;

use crate::{
    api::{self, User},
    error::{Error, Result},
    password::{self, Prompt},
    session::SessionManager,
};

const ATTEMPTS: usize = 3;

/// Log in with an ID number and password.
#[derive(Debug, Parser)]
pub(crate) struct Command {
    /// The ID number to log in with. You are asked for it when it is not
    /// given.
    #[arg(long, env = "SPHERE_ID")]
    id: Option<String>,

    /// Read the password from the first line of standard input instead of
    /// asking for it.
    #[arg(long)]
    password_stdin: bool,
}

async fn ask_for_id() -> Result<Option<String>> {
    let line = task::spawn_blocking(|| {
        let mut stderr = io::stderr().lock();
        write!(stderr, "ID number: ")?;
        stderr.flush()?;

        let mut line = String::new();
        io::stdin().lock().read_line(&mut line).map(|_| line)
    })
    .await??;

    let id = line.trim();
    Ok((!id.is_empty()).then(|| id.to_owned()))
}

/// Asks for a password and logs in, asking again after a rejection until
/// `attempts` runs out.
async fn log_in(
    session: &SessionManager,
    id_no: &str,
    prompt: &dyn Prompt,
    attempts: usize,
) -> Result<User> {
    let mut last_error: Option<String> = None;
    for attempt in 1..=attempts {
        let mut req = password::RequestBuilder::new();
        if let Some(ref message) = last_error {
            req = req.with_error(message);
        }
        let password = prompt
            .prompt(req.into_request())
            .await?
            .ok_or(Error::Cancelled)?;

        match session
            .login(api::ObtainToken {
                id_no: id_no.to_owned(),
                password,
            })
            .await
        {
            Ok(_) => {
                info!("Logged in after {} attempt(s)", attempt);
                return session.current_user().ok_or(Error::NotAuthenticated);
            }
            Err(err) if err.is_unauthorized() && attempt < attempts => {
                last_error = session.snapshot().last_error;
            }
            Err(err) => return Err(super::report(session, err)),
        }
    }

    Err(Error::Cancelled)
}

#[async_trait]
impl super::Command for Command {
    async fn execute(self, session: Arc<SessionManager>) -> Result<()> {
        let id_no = match self.id {
            Some(id_no) => id_no,
            None if self.password_stdin => {
                error!("Pass --id when the password comes from standard input");
                return Err(Error::Command);
            }
            None => ask_for_id().await?.ok_or(Error::Cancelled)?,
        };

        let user = if self.password_stdin {
            // A scripted password cannot be corrected, so it gets one try.
            log_in(&session, &id_no, &password::StdinPrompt, 1).await?
        } else {
            log_in(&session, &id_no, &password::RpasswordPrompt, ATTEMPTS).await?
        };

        println!("Logged in as {} ({}).", user.display_name(), user.user_type);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use reqwest::{Method, StatusCode};
    use secrecy::SecretString;
    use serde_json::json;

    use super::*;
    use crate::{
        http::{
            testing::{access_token, Scripted},
            ApiClient, Transport,
        },
        storage::{Memory, Storage},
    };

    const ID: &str = "2023A7PS0466G";

    /// Answers with the given passwords in turn and remembers what it was
    /// told.
    #[derive(Default)]
    struct Answers {
        passwords: Mutex<Vec<&'static str>>,
        errors: Mutex<Vec<Option<String>>>,
    }

    #[async_trait]
    impl Prompt for Answers {
        async fn prompt(&self, req: password::Request) -> Result<Option<SecretString>> {
            self.errors
                .lock()
                .unwrap()
                .push(req.error().map(str::to_owned));
            let mut passwords = self.passwords.lock().unwrap();
            Ok((!passwords.is_empty()).then(|| SecretString::new(passwords.remove(0).to_owned())))
        }
    }

    fn session_over(transport: &Arc<Scripted>) -> SessionManager {
        SessionManager::new(Arc::new(ApiClient::new(
            Arc::new(Memory::new()) as Arc<dyn Storage>,
            Arc::clone(transport) as Arc<dyn Transport>,
        )))
    }

    #[test]
    fn id_is_optional() {
        let cmd = Command::try_parse_from(["login", "--password-stdin"]).unwrap();
        assert!(cmd.password_stdin);
        if std::env::var_os("SPHERE_ID").is_none() {
            assert_eq!(cmd.id, None);
        }

        let cmd = Command::try_parse_from(["login", "--id", ID]).unwrap();
        assert_eq!(cmd.id.as_deref(), Some(ID));
    }

    #[tokio::test]
    async fn rejected_password_is_asked_again_with_the_reason() -> Result<()> {
        let transport = Arc::new(Scripted::new());
        transport.once(
            Method::POST,
            "/auth/token/",
            StatusCode::UNAUTHORIZED,
            json!({"detail": "No active account found with the given credentials"}),
        );
        transport.always(
            Method::POST,
            "/auth/token/",
            StatusCode::OK,
            json!({"access": access_token(ID, None, 300), "refresh": "refresh"}),
        );
        let session = session_over(&transport);
        let prompt = Answers {
            passwords: Mutex::new(vec!["wrong", "right"]),
            ..Answers::default()
        };

        let user = log_in(&session, ID, &prompt, ATTEMPTS).await?;

        assert_eq!(user.id_no, ID);
        assert_eq!(
            *prompt.errors.lock().unwrap(),
            [
                None,
                Some("No active account found with the given credentials".to_owned())
            ]
        );
        let bodies: Vec<_> = transport
            .calls_to(&Method::POST, "/auth/token/")
            .into_iter()
            .map(|call| call.body)
            .collect();
        assert_eq!(
            bodies,
            [
                Some(json!({"id_no": ID, "password": "wrong"})),
                Some(json!({"id_no": ID, "password": "right"})),
            ]
        );
        Ok(())
    }

    #[tokio::test]
    async fn single_attempt_gives_up_on_rejection() -> Result<()> {
        let transport = Arc::new(Scripted::new());
        transport.always(
            Method::POST,
            "/auth/token/",
            StatusCode::UNAUTHORIZED,
            json!({"detail": "No active account found with the given credentials"}),
        );
        let session = session_over(&transport);
        let prompt = Answers {
            passwords: Mutex::new(vec!["wrong", "unused"]),
            ..Answers::default()
        };

        let err = log_in(&session, ID, &prompt, 1).await.unwrap_err();

        assert!(err.is_unauthorized());
        assert_eq!(transport.calls_to(&Method::POST, "/auth/token/").len(), 1);
        Ok(())
    }

    #[tokio::test]
    async fn empty_prompt_cancels() -> Result<()> {
        let transport = Arc::new(Scripted::new());
        let session = session_over(&transport);

        let err = log_in(&session, ID, &Answers::default(), ATTEMPTS)
            .await
            .unwrap_err();

        assert!(matches!(err, Error::Cancelled));
        assert!(transport.calls_to(&Method::POST, "/auth/token/").is_empty());
        Ok(())
    }
}
