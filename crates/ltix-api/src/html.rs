//! Minimal server-rendered pages: auto-submitting forms and the error page.

/// Escape a value for use inside an HTML attribute or text node.
pub fn html_escape(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

/// A form that POSTs `params` to `action` as soon as the page loads.
pub fn auto_submit_form<'a, I>(action: &str, params: I) -> String
where
    I: IntoIterator<Item = (&'a str, &'a str)>,
{
    let mut page = format!(
        "<form action=\"{}\" name=\"ltiAuthForm\" id=\"ltiAuthForm\" method=\"post\" \
         enctype=\"application/x-www-form-urlencoded\">\n",
        html_escape(action)
    );
    for (name, value) in params {
        page.push_str(&format!(
            "  <input type=\"hidden\" name=\"{}\" value=\"{}\"/>\n",
            html_escape(name),
            html_escape(value)
        ));
    }
    page.push_str("</form>\n");
    page.push_str(
        "<script type=\"text/javascript\">\n//<![CDATA[\ndocument.ltiAuthForm.submit();\n//]]>\n</script>\n",
    );
    page
}

/// Re-POST the request to itself with `repost=true`.
///
/// Browsers drop third-party cookies on the cross-site POST from the tool;
/// the same-site re-post brings the session cookie back.
pub fn repost_page<'a, I>(action: &str, params: I) -> String
where
    I: IntoIterator<Item = (&'a str, &'a str)>,
{
    let params: Vec<(&str, &str)> = params
        .into_iter()
        .filter(|(name, _)| *name != "repost")
        .chain(std::iter::once(("repost", "true")))
        .collect();
    format!(
        "<!DOCTYPE html>\n<html>\n<head><title>Redirecting</title></head>\n<body>\n{}</body>\n</html>\n",
        auto_submit_form(action, params)
    )
}

pub fn error_page(message: &str) -> String {
    format!(
        "<!DOCTYPE html>\n<html>\n<head><title>Error</title></head>\n<body>\n\
         <h1>Invalid request</h1>\n<p>{}</p>\n</body>\n</html>\n",
        html_escape(message)
    )
}
