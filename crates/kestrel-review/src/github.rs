use kestrel_core::{FeedbackComment, KestrelError, PullRequestInfo};

/// GitHub client for fetching pull request data and posting reviews.
///
/// Uses octocrab for the typed API surface and a raw reqwest client for the
/// diff media type, which octocrab does not expose.
pub struct GitHubClient {
    octocrab: octocrab::Octocrab,
    http: reqwest::Client,
    token: String,
}

impl GitHubClient {
    /// Create a client from an explicit token or the `GITHUB_TOKEN`
    /// environment variable.
    ///
    /// # Errors
    ///
    /// Returns [`KestrelError::Config`] if no token is available, or
    /// [`KestrelError::Github`] if the client cannot be built.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use kestrel_review::github::GitHubClient;
    ///
    /// let client = GitHubClient::new(Some("ghp_xxxx")).unwrap();
    /// ```
    pub fn new(token: Option<&str>) -> Result<Self, KestrelError> {
        let token = match token {
            Some(t) => t.to_string(),
            None => std::env::var("GITHUB_TOKEN").map_err(|_| {
                KestrelError::Config(
                    "GITHUB_TOKEN not set. Provide the github-token input or set GITHUB_TOKEN"
                        .into(),
                )
            })?,
        };

        let octocrab = octocrab::Octocrab::builder()
            .personal_token(token.clone())
            .build()
            .map_err(|e| KestrelError::Github(format!("failed to create GitHub client: {e}")))?;

        let http = reqwest::Client::new();

        Ok(Self {
            octocrab,
            http,
            token,
        })
    }

    /// Fetch the pull request metadata used as prompt context.
    ///
    /// Missing title or body become empty strings.
    ///
    /// # Errors
    ///
    /// Returns [`KestrelError::Github`] on network or API errors.
    pub async fn get_pull_request(
        &self,
        owner: &str,
        repo: &str,
        number: u64,
    ) -> Result<PullRequestInfo, KestrelError> {
        let pr = self
            .octocrab
            .pulls(owner, repo)
            .get(number)
            .await
            .map_err(|e| KestrelError::Github(format!("failed to fetch PR metadata: {e}")))?;

        Ok(PullRequestInfo {
            owner: owner.to_string(),
            repo: repo.to_string(),
            number,
            title: pr.title.unwrap_or_default(),
            body: pr.body.unwrap_or_default(),
        })
    }

    /// Fetch the full unified diff for a pull request.
    ///
    /// # Errors
    ///
    /// Returns [`KestrelError::Github`] on network or API errors.
    pub async fn get_pr_diff(
        &self,
        owner: &str,
        repo: &str,
        number: u64,
    ) -> Result<String, KestrelError> {
        let url = format!("https://api.github.com/repos/{owner}/{repo}/pulls/{number}");
        self.fetch_diff(&url).await
    }

    /// Fetch the unified diff between two revisions.
    ///
    /// Used on `"synchronize"` events to review only what the push changed.
    ///
    /// # Errors
    ///
    /// Returns [`KestrelError::Github`] on network or API errors.
    pub async fn compare_diff(
        &self,
        owner: &str,
        repo: &str,
        base: &str,
        head: &str,
    ) -> Result<String, KestrelError> {
        let url = format!("https://api.github.com/repos/{owner}/{repo}/compare/{base}...{head}");
        self.fetch_diff(&url).await
    }

    async fn fetch_diff(&self, url: &str) -> Result<String, KestrelError> {
        let response = self
            .http
            .get(url)
            .header("Accept", "application/vnd.github.v3.diff")
            .header("Authorization", format!("Bearer {}", self.token))
            .header("User-Agent", "kestrel")
            .send()
            .await
            .map_err(|e| KestrelError::Github(format!("failed to fetch diff: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(KestrelError::Github(format!(
                "GitHub API error {status}: {body}"
            )));
        }

        response
            .text()
            .await
            .map_err(|e| KestrelError::Github(format!("failed to read diff response: {e}")))
    }

    /// Post the accumulated comments as one review with event `COMMENT`.
    ///
    /// Callers must not invoke this with an empty list; the no-findings case
    /// performs no submission at all.
    ///
    /// # Errors
    ///
    /// Returns [`KestrelError::Github`] on API errors.
    pub async fn post_review(
        &self,
        owner: &str,
        repo: &str,
        number: u64,
        comments: &[FeedbackComment],
    ) -> Result<(), KestrelError> {
        let review_comments: Vec<serde_json::Value> = comments
            .iter()
            .map(|c| {
                serde_json::json!({
                    "path": c.path.to_string_lossy(),
                    "line": c.line,
                    "side": "RIGHT",
                    "body": c.body,
                })
            })
            .collect();

        let route = format!("/repos/{owner}/{repo}/pulls/{number}/reviews");
        let body = serde_json::json!({
            "event": "COMMENT",
            "comments": review_comments,
        });

        let _response: serde_json::Value = self
            .octocrab
            .post(route, Some(&body))
            .await
            .map_err(|e| KestrelError::Github(format!("failed to post review: {e}")))?;

        Ok(())
    }
}
