//! Chrome DevTools Protocol driver backed by `chromiumoxide`.

use std::path::PathBuf;

use async_trait::async_trait;
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::cdp::browser_protocol::network::{Cookie, CookieParam, CookieSameSite};
use chromiumoxide::cdp::browser_protocol::page::PrintToPdfParams;
use chromiumoxide::{Element, Page};
use futures_util::StreamExt;
use tokio::task::JoinHandle;
use tracing::{debug, info, instrument, warn};

use super::{BrowserDriver, DriverError, PageElement, PrintOptions, Selector};
use crate::session::{Credential, SameSite};

/// Desktop Chrome user agent presented to the platform.
pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
     (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

/// Browser launch settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LaunchOptions {
    /// Run without a visible window. Manual login needs a visible one.
    pub headless: bool,
    /// Chrome/Chromium binary; auto-detected when `None`.
    pub executable: Option<PathBuf>,
    pub window_width: u32,
    pub window_height: u32,
    pub user_agent: String,
}

impl Default for LaunchOptions {
    fn default() -> Self {
        Self {
            headless: false,
            executable: None,
            window_width: 1920,
            window_height: 1080,
            user_agent: DEFAULT_USER_AGENT.to_string(),
        }
    }
}

impl LaunchOptions {
    fn browser_config(&self) -> Result<BrowserConfig, DriverError> {
        let mut builder = BrowserConfig::builder()
            .window_size(self.window_width, self.window_height)
            .no_sandbox()
            .args(vec![
                "--disable-dev-shm-usage".to_string(),
                "--disable-gpu".to_string(),
                "--disable-blink-features=AutomationControlled".to_string(),
                format!("--user-agent={}", self.user_agent),
            ]);
        if !self.headless {
            builder = builder.with_head();
        }
        if let Some(executable) = &self.executable {
            builder = builder.chrome_executable(executable);
        }
        builder.build().map_err(DriverError::Launch)
    }
}

/// A launched Chrome instance with a single working page.
pub struct ChromiumDriver {
    browser: Browser,
    page: Page,
    handler: Option<JoinHandle<()>>,
    closed: bool,
}

impl ChromiumDriver {
    /// Launches the browser and opens a blank page.
    ///
    /// # Errors
    ///
    /// Returns [`DriverError::Launch`] when no browser can be started.
    #[instrument(level = "debug", skip(options), fields(headless = options.headless))]
    pub async fn launch(options: &LaunchOptions) -> Result<Self, DriverError> {
        let config = options.browser_config()?;
        let (mut browser, mut handler) = Browser::launch(config)
            .await
            .map_err(|e| DriverError::Launch(e.to_string()))?;

        // The CDP connection only makes progress while the handler is polled.
        let handler_task = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(error) = event {
                    debug!(error = %error, "browser handler event error");
                }
            }
        });

        let page = match browser.new_page("about:blank").await {
            Ok(page) => page,
            Err(error) => {
                let _ = browser.close().await;
                handler_task.abort();
                return Err(DriverError::Launch(error.to_string()));
            }
        };

        info!("browser launched");
        Ok(Self {
            browser,
            page,
            handler: Some(handler_task),
            closed: false,
        })
    }
}

struct ChromiumElement(Element);

#[async_trait]
impl PageElement for ChromiumElement {
    async fn text(&self) -> Result<String, DriverError> {
        self.0
            .inner_text()
            .await
            .map(Option::unwrap_or_default)
            .map_err(|e| DriverError::Protocol(e.to_string()))
    }

    async fn attribute(&self, name: &str) -> Result<Option<String>, DriverError> {
        self.0
            .attribute(name)
            .await
            .map_err(|e| DriverError::Protocol(e.to_string()))
    }

    async fn inner_html(&self) -> Result<String, DriverError> {
        self.0
            .inner_html()
            .await
            .map(Option::unwrap_or_default)
            .map_err(|e| DriverError::Protocol(e.to_string()))
    }
}

fn to_credential(cookie: Cookie) -> Credential {
    let same_site = match cookie.same_site {
        Some(CookieSameSite::Strict) => SameSite::Strict,
        Some(CookieSameSite::None) => SameSite::None,
        _ => SameSite::Lax,
    };
    let mut credential = Credential::new(
        cookie.name,
        cookie.value,
        cookie.domain,
        cookie.path,
        same_site,
    );
    credential
        .extra
        .insert("secure".to_string(), cookie.secure.into());
    credential
        .extra
        .insert("httpOnly".to_string(), cookie.http_only.into());
    if !cookie.session {
        // CDP reports seconds since epoch as a float.
        #[allow(clippy::cast_possible_truncation)]
        let expiry = cookie.expires as i64;
        credential.extra.insert("expiry".to_string(), expiry.into());
    }
    credential
}

fn to_cookie_param(credential: &Credential, fallback_url: &str) -> Result<CookieParam, DriverError> {
    let same_site = match credential.same_site {
        SameSite::Strict => CookieSameSite::Strict,
        SameSite::Lax => CookieSameSite::Lax,
        SameSite::None => CookieSameSite::None,
    };
    let mut builder = CookieParam::builder()
        .name(credential.name.clone())
        .value(credential.value())
        .path(credential.path.clone())
        .same_site(same_site);
    builder = if credential.domain.is_empty() {
        builder.url(fallback_url)
    } else {
        builder.domain(credential.domain.clone())
    };
    if let Some(secure) = credential.flag("secure") {
        builder = builder.secure(secure);
    }
    if let Some(http_only) = credential.flag("httpOnly") {
        builder = builder.http_only(http_only);
    }
    builder
        .build()
        .map_err(|reason| DriverError::Cookies(format!("{}: {reason}", credential.name)))
}

#[async_trait]
impl BrowserDriver for ChromiumDriver {
    #[instrument(level = "debug", skip(self))]
    async fn navigate(&mut self, url: &str) -> Result<(), DriverError> {
        self.page
            .goto(url)
            .await
            .map(|_| ())
            .map_err(|e| DriverError::Navigation {
                url: url.to_string(),
                reason: e.to_string(),
            })
    }

    async fn reload(&mut self) -> Result<(), DriverError> {
        self.page
            .reload()
            .await
            .map(|_| ())
            .map_err(|e| DriverError::Protocol(e.to_string()))
    }

    async fn current_url(&mut self) -> Result<String, DriverError> {
        self.page
            .url()
            .await
            .map(Option::unwrap_or_default)
            .map_err(|e| DriverError::Protocol(e.to_string()))
    }

    async fn query(
        &mut self,
        selector: &Selector,
    ) -> Result<Vec<Box<dyn PageElement>>, DriverError> {
        let found = match selector {
            Selector::Css(expr) => self.page.find_elements(expr.as_str()).await,
            Selector::XPath(expr) => self.page.find_xpaths(expr.as_str()).await,
        };
        let elements = found.map_err(|e| DriverError::Query {
            selector: selector.to_string(),
            reason: e.to_string(),
        })?;
        Ok(elements
            .into_iter()
            .map(|element| Box::new(ChromiumElement(element)) as Box<dyn PageElement>)
            .collect())
    }

    async fn execute(&mut self, script: &str) -> Result<serde_json::Value, DriverError> {
        let result = self
            .page
            .evaluate(script)
            .await
            .map_err(|e| DriverError::Script(e.to_string()))?;
        Ok(result.value().cloned().unwrap_or(serde_json::Value::Null))
    }

    async fn page_source(&mut self) -> Result<String, DriverError> {
        self.page
            .content()
            .await
            .map_err(|e| DriverError::Protocol(e.to_string()))
    }

    async fn title(&mut self) -> Result<String, DriverError> {
        self.page
            .get_title()
            .await
            .map(Option::unwrap_or_default)
            .map_err(|e| DriverError::Protocol(e.to_string()))
    }

    async fn cookies(&mut self) -> Result<Vec<Credential>, DriverError> {
        let cookies = self
            .page
            .get_cookies()
            .await
            .map_err(|e| DriverError::Cookies(e.to_string()))?;
        Ok(cookies.into_iter().map(to_credential).collect())
    }

    #[instrument(level = "debug", skip_all, fields(count = credentials.len()))]
    async fn apply_cookies(&mut self, credentials: &[Credential]) -> Result<(), DriverError> {
        let current = self.current_url().await?;
        let params = credentials
            .iter()
            .map(|credential| to_cookie_param(credential, &current))
            .collect::<Result<Vec<_>, _>>()?;
        self.page
            .set_cookies(params)
            .await
            .map(|_| ())
            .map_err(|e| DriverError::Cookies(e.to_string()))
    }

    async fn print_to_document(&mut self, options: &PrintOptions) -> Result<String, DriverError> {
        let params = PrintToPdfParams {
            landscape: Some(options.landscape),
            display_header_footer: Some(options.display_header_footer),
            print_background: Some(options.print_background),
            prefer_css_page_size: Some(options.prefer_css_page_size),
            paper_width: Some(options.paper_width),
            paper_height: Some(options.paper_height),
            margin_top: Some(options.margin_top),
            margin_bottom: Some(options.margin_bottom),
            margin_left: Some(options.margin_left),
            margin_right: Some(options.margin_right),
            ..Default::default()
        };
        let response = self
            .page
            .execute(params)
            .await
            .map_err(|e| DriverError::Print(e.to_string()))?;
        Ok(String::from(response.result.data))
    }

    async fn close(&mut self) -> Result<(), DriverError> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;

        let closed = self.browser.close().await;
        if let Err(error) = self.browser.wait().await {
            warn!(error = %error, "browser process did not exit cleanly");
        }
        if let Some(handler) = self.handler.take() {
            handler.abort();
        }
        closed
            .map(|_| ())
            .map_err(|e| DriverError::Protocol(e.to_string()))
    }
}
