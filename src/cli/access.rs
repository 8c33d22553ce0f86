use crate::access::{AccessPolicy, AuthDecision, AuthSource, RequestContext};
use crate::error::Result;
use crate::settings::Settings;

pub fn run(
    settings: &Settings,
    path: &str,
    user: Option<&str>,
    token: Option<&str>,
    api: bool,
) -> Result<()> {
    let policy = AccessPolicy::from_settings(&settings.auth);
    let ctx = RequestContext {
        path: path.to_string(),
        session_user: user.map(str::to_string),
        bearer_token: token.map(str::to_string),
        is_api: api,
    };

    match policy.authorize(&ctx) {
        AuthDecision::Authorized(principal) => {
            let via = match principal.via {
                AuthSource::Session => "session",
                AuthSource::DevAutoLogin => "dev auto-login",
                AuthSource::ApiToken => "api token",
            };
            let demo = if principal.is_demo { ", demo" } else { "" };
            println!("authorized: {} (via {via}{demo})", principal.user);
        }
        AuthDecision::DenyRedirect { location, message } => {
            println!("redirect to {location}: {message}");
        }
        AuthDecision::RequireLogin => {
            if api {
                println!("401 login required");
            } else {
                println!("redirect to /login: login required");
            }
        }
    }
    Ok(())
}
