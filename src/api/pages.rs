//! Server-rendered HTML pages.

use axum::response::Html;

use crate::models::{RequestStatus, ServiceRequest};
use crate::notification::compose::escape_html as esc;
use crate::notification::directory::DEPARTMENT_CODES;

const SERVICE_TYPES: &[&str] = &["Hardware", "Software", "Network", "Account", "Other"];

fn layout(title: &str, is_admin: bool, body: &str) -> Html<String> {
    let nav = if is_admin {
        r#"<a href="/">New request</a> | <a href="/status">Status</a> | <a href="/logout">Log out</a>"#
    } else {
        r#"<a href="/">New request</a> | <a href="/status">Status</a> | <a href="/login">Admin</a>"#
    };
    Html(format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="utf-8">
<meta name="viewport" content="width=device-width, initial-scale=1">
<title>{title}</title>
</head>
<body>
<nav>{nav}</nav>
<main>
{body}
</main>
</body>
</html>
"#,
        title = esc(title),
        nav = nav,
        body = body
    ))
}

pub fn index(is_admin: bool) -> Html<String> {
    let departments: String = DEPARTMENT_CODES
        .iter()
        .map(|d| format!("<option value=\"{d}\">{d}</option>"))
        .collect();
    let service_types: String = SERVICE_TYPES
        .iter()
        .map(|s| format!("<option value=\"{s}\">{s}</option>"))
        .collect();
    let body = format!(
        r#"<h1>IT Service Request</h1>
<form method="post" action="/submit">
<label>Name <input name="name" required></label>
<label>Phone <input name="phone" required></label>
<label>Department <select name="department" required>{departments}</select></label>
<label>Position <input name="position" required></label>
<label>Service type <select name="serviceType" required>{service_types}</select></label>
<label>Asset ID <input name="assetID"></label>
<label>Software name <input name="softwareName"></label>
<label>Topic <input name="otherTopic"></label>
<label>Details <textarea name="details" required></textarea></label>
<button type="submit">Submit</button>
</form>"#
    );
    layout("IT Service Request", is_admin, &body)
}

fn status_class(status: RequestStatus) -> &'static str {
    match status {
        RequestStatus::PendingApproval => "pending",
        RequestStatus::ApprovedPendingIT => "approved",
        RequestStatus::Disapproved => "disapproved",
    }
}

pub fn status(requests: &[ServiceRequest], is_admin: bool) -> Html<String> {
    let mut rows = String::new();
    for r in requests {
        let extra = [
            ("Asset ID", &r.asset_id),
            ("Software", &r.software_name),
            ("Topic", &r.other_topic),
        ]
        .iter()
        .filter(|(_, v)| !v.is_empty())
        .map(|(label, v)| format!("<br><small>{}: {}</small>", label, esc(v)))
        .collect::<String>();
        let actions = if is_admin {
            format!(
                r#"<td><form method="post" action="/delete/{}"><button type="submit">Delete</button></form></td>"#,
                r.id
            )
        } else {
            String::new()
        };
        rows.push_str(&format!(
            "<tr class=\"{class}\"><td>{rank}</td><td>{id}</td><td>{at}</td><td>{name}</td>\
             <td>{phone}</td><td>{dept}</td><td>{pos}</td><td>{svc}</td><td>{details}{extra}</td>\
             <td>{status}</td>{actions}</tr>\n",
            class = status_class(r.status),
            rank = r.sort_order,
            id = r.id,
            at = esc(&r.submitted_at),
            name = esc(&r.requester_name),
            phone = esc(&r.requester_phone),
            dept = esc(&r.department),
            pos = esc(&r.position),
            svc = esc(&r.service_type),
            details = esc(&r.details),
            extra = extra,
            status = esc(r.status.label()),
            actions = actions,
        ));
    }

    let admin_header = if is_admin { "<th></th>" } else { "" };
    let clear = if is_admin && !requests.is_empty() {
        r#"<form method="post" action="/clear-all"><button type="submit">Clear all requests</button></form>"#
    } else {
        ""
    };
    let table = if requests.is_empty() {
        "<p>No requests yet.</p>".to_string()
    } else {
        format!(
            "<table>\n<tr><th>#</th><th>ID</th><th>Submitted</th><th>Name</th><th>Phone</th>\
             <th>Department</th><th>Position</th><th>Service</th><th>Details</th><th>Status</th>{}</tr>\n{}</table>",
            admin_header, rows
        )
    };
    layout(
        "Request Status",
        is_admin,
        &format!("<h1>Request Status</h1>\n{}\n{}", table, clear),
    )
}

pub fn message(title: &str, message: &str) -> Html<String> {
    let body = format!("<h1>{}</h1>\n<p>{}</p>", esc(title), esc(message));
    layout(title, false, &body)
}

pub fn login(error: bool) -> Html<String> {
    let notice = if error {
        "<p class=\"error\">Invalid username or password.</p>"
    } else {
        ""
    };
    let body = format!(
        r#"<h1>Admin Login</h1>
{notice}
<form method="post" action="/login">
<label>Username <input name="username" autocomplete="username" required></label>
<label>Password <input type="password" name="password" autocomplete="current-password" required></label>
<button type="submit">Log in</button>
</form>"#
    );
    layout("Admin Login", false, &body)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::NewServiceRequest;

    fn row(id: i64, rank: i64, status: RequestStatus) -> ServiceRequest {
        let mut r = NewServiceRequest {
            submitted_at: "16/10/2026, 09:00:00".into(),
            requester_name: format!("<b>user{id}</b>"),
            requester_phone: "1".into(),
            department: "IT_dep".into(),
            position: "P".into(),
            service_type: "Other".into(),
            details: "D".into(),
            asset_id: String::new(),
            software_name: String::new(),
            other_topic: "Chairs".into(),
            approval_token: format!("secret-token-{id}"),
        }
        .into_request(id, rank);
        r.status = status;
        r
    }

    #[test]
    fn test_status_page_escapes_and_hides_tokens() {
        let rows = vec![row(1, 1, RequestStatus::PendingApproval)];
        let Html(html) = status(&rows, false);
        assert!(html.contains("&lt;b&gt;user1&lt;/b&gt;"));
        assert!(!html.contains("secret-token-1"));
        assert!(html.contains("Topic: Chairs"));
        assert!(!html.contains("/delete/1"));
    }

    #[test]
    fn test_status_page_admin_controls() {
        let rows = vec![row(4, 1, RequestStatus::Disapproved)];
        let Html(html) = status(&rows, true);
        assert!(html.contains("action=\"/delete/4\""));
        assert!(html.contains("action=\"/clear-all\""));
        assert!(html.contains("Disapproved"));
    }

    #[test]
    fn test_index_lists_departments() {
        let Html(html) = index(false);
        assert!(html.contains("<option value=\"PY_dep\">"));
        assert!(html.contains("name=\"serviceType\""));
    }
}
