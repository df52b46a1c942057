//! Task text handed to the delegated agent. Each builder spells out the
//! exact result phrase the agent must report, which is what `outcome`
//! classifies on the way back.

use crate::config::Credentials;

/// Log in with the given credentials. The returned string contains the
/// password; callers must never log it.
pub fn login(credentials: &Credentials) -> String {
    format!(
        "Go to https://www.instagram.com/accounts/login/ and log in. \
         Type the username '{}' into the username field, the password '{}' into \
         the password field, then submit. Dismiss any 'Save your login info' or \
         notification dialogs by choosing 'Not now'. \
         When the home feed is visible, call done with 'logged in'. \
         If login is rejected, call done with 'login failed'.",
        credentials.username, credentials.password
    )
}

/// Check for an existing session without touching the login form.
pub fn verify_login() -> String {
    "Go to https://www.instagram.com/ and wait for it to load. \
     If the home feed is visible (posts, stories, navigation sidebar), \
     call done with 'logged in'. If a login form or 'Log in' button is \
     shown instead, call done with 'not logged in'."
        .into()
}

/// Find the next unvisited post in the home feed and report its URL.
pub fn open_new_feed_post(visited: &[String]) -> String {
    let skip_list = if visited.is_empty() {
        String::new()
    } else {
        // Only the most recent handful; the agent cannot use hundreds.
        let recent: Vec<&str> = visited
            .iter()
            .rev()
            .take(10)
            .map(String::as_str)
            .collect();
        format!(
            " Skip these already-visited posts: {}.",
            recent.join(", ")
        )
    };
    format!(
        "You are on the Instagram home feed. Scroll to find the next post you \
         have not seen yet and open it by clicking its timestamp or using its \
         permalink, so that the URL contains /p/ or /reel/.{skip_list} \
         Report the opened post's full URL, then call done with that URL. \
         If no new post can be found after scrolling a few times, call done \
         with 'none'."
    )
}

/// Close the currently open post overlay and return to the feed.
pub fn close_post() -> String {
    "Close the currently open Instagram post (press Escape or click the X) \
     so the feed is visible again, then call done with 'closed'."
        .into()
}

/// Like one post by URL. The agent must use its dedicated like tool.
pub fn like_post(url: &str) -> String {
    format!(
        "Open {url} and like the post. You MUST use the like_post tool to do \
         the actual liking. Then call done with exactly what like_post \
         reported: 'liked', 'already liked', or 'failed'."
    )
}

/// Comment on one post. With `Some(text)` the agent posts that text
/// verbatim; with `None` it composes a short relevant comment itself.
pub fn comment_on_post(url: &str, text: Option<&str>) -> String {
    let instruction = match text {
        Some(text) => format!("Write exactly this comment: {text}"),
        None => "Look at the post and write one short, positive, relevant \
                 comment (under 15 words)"
            .to_string(),
    };
    format!(
        "Open {url}. {instruction}. Click into the comment field, type the \
         comment, and submit it with the Post button or Enter. Once the \
         comment appears under the post, call done with 'commented: ' \
         followed by the comment text. If commenting is not possible, call \
         done with 'failed'."
    )
}

/// Follow one user, optionally liking a recent post first so the follow
/// does not arrive cold.
pub fn follow_user(username: &str, engage_first: bool) -> String {
    let warmup = if engage_first {
        " First open their most recent post and like it with the like_post \
         tool, then go back to the profile."
    } else {
        ""
    };
    format!(
        "Open https://www.instagram.com/{username}/.{warmup} Click the Follow \
         button on the profile. If the button already says Following or \
         Requested, that counts. Then call done with 'followed'. If the \
         profile does not exist or the button cannot be clicked, call done \
         with 'failed'."
    )
}

/// Collect recent post URLs from a hashtag page.
pub fn collect_hashtag_posts(hashtag: &str, max: usize) -> String {
    format!(
        "Open https://www.instagram.com/explore/tags/{hashtag}/ and wait for \
         the grid to load. Collect the permalink URLs of up to {max} recent \
         posts (links containing /p/ or /reel/) by reading the grid's anchor \
         hrefs, scrolling once or twice if needed. Report the URLs, one per \
         line, using the report tool, then call done with 'collected'. If the \
         page is empty or unavailable, call done with 'failed'."
    )
}

/// Collect usernames of accounts posting under a hashtag.
pub fn collect_usernames_from_hashtag(hashtag: &str, max: usize) -> String {
    format!(
        "Open https://www.instagram.com/explore/tags/{hashtag}/, open a few of \
         the recent posts, and note the username of each post's author. \
         Gather up to {max} distinct usernames. Report them space-separated \
         with the report tool, then call done with 'collected'. If none can \
         be gathered, call done with 'failed'."
    )
}

/// Collect usernames from a competitor account's followers list.
pub fn collect_usernames_from_followers(account: &str, max: usize) -> String {
    format!(
        "Open https://www.instagram.com/{account}/ and click the 'followers' \
         count to open the followers dialog. Read up to {max} usernames from \
         the list, scrolling the dialog if needed. Report them \
         space-separated with the report tool, then call done with \
         'collected'. If the list is private or empty, call done with \
         'failed'."
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_login_embeds_credentials() {
        let creds = Credentials {
            username: "alice".into(),
            password: "hunter2".into(),
        };
        let task = login(&creds);
        assert!(task.contains("alice"));
        assert!(task.contains("hunter2"));
        assert!(task.contains("'logged in'"));
        assert!(task.contains("'login failed'"));
    }

    #[test]
    fn test_open_new_feed_post_lists_recent_visited_only() {
        let visited: Vec<String> = (0..30)
            .map(|i| format!("https://www.instagram.com/p/post{i}/"))
            .collect();
        let task = open_new_feed_post(&visited);
        assert!(task.contains("post29"));
        assert!(!task.contains("post0/"));
        assert!(task.contains("'none'"));
    }

    #[test]
    fn test_open_new_feed_post_empty_visited() {
        let task = open_new_feed_post(&[]);
        assert!(!task.contains("already-visited"));
    }

    #[test]
    fn test_like_post_requires_tool() {
        let task = like_post("https://www.instagram.com/p/abc/");
        assert!(task.contains("like_post"));
        assert!(task.contains("'already liked'"));
    }

    #[test]
    fn test_comment_with_and_without_text() {
        let with = comment_on_post("https://www.instagram.com/p/abc/", Some("Love this! 🔥"));
        assert!(with.contains("Love this! 🔥"));
        let without = comment_on_post("https://www.instagram.com/p/abc/", None);
        assert!(without.contains("compose") || without.contains("write one short"));
    }

    #[test]
    fn test_follow_user_warmup_toggle() {
        assert!(follow_user("bob", true).contains("like_post"));
        assert!(!follow_user("bob", false).contains("like_post"));
    }

    #[test]
    fn test_hashtag_tasks_embed_tag() {
        assert!(collect_hashtag_posts("fitness", 10).contains("/explore/tags/fitness/"));
        assert!(collect_usernames_from_hashtag("vegan", 5).contains("/explore/tags/vegan/"));
        assert!(collect_usernames_from_followers("rivalgym", 20).contains("/rivalgym/"));
    }
}
