//! Mail bodies for the two workflow notifications.

use super::OutgoingMail;
use crate::models::ServiceRequest;

/// Minimal HTML escaping for values interpolated into markup.
pub fn escape_html(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
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

fn item(label: &str, value: &str) -> String {
    format!(
        "<li><strong>{}:</strong> {}</li>\n",
        label,
        escape_html(value)
    )
}

fn optional_items(request: &ServiceRequest) -> String {
    let mut out = String::new();
    for (label, value) in [
        ("Asset ID", &request.asset_id),
        ("Software Name", &request.software_name),
        ("Topic", &request.other_topic),
    ] {
        if !value.is_empty() {
            out.push_str(&item(label, value));
        }
    }
    out
}

pub fn approve_link(app_url: &str, token: &str) -> String {
    format!("{}/approve/{}", app_url.trim_end_matches('/'), token)
}

pub fn disapprove_link(app_url: &str, token: &str) -> String {
    format!("{}/disapprove/{}", app_url.trim_end_matches('/'), token)
}

/// Manager mail for a new request, with approve/disapprove links.
pub fn submission_mail(request: &ServiceRequest, from: &str, to: &str, app_url: &str) -> OutgoingMail {
    let approve = approve_link(app_url, &request.approval_token);
    let disapprove = disapprove_link(app_url, &request.approval_token);

    let mut html = String::from("<h1>New IT Service Request</h1>\n");
    html.push_str("<p>A request needs your approval.</p>\n<ul>\n");
    html.push_str(&item("Name", &request.requester_name));
    html.push_str(&item("Position", &request.position));
    html.push_str(&item("Department", &request.department));
    html.push_str(&item("Service Type", &request.service_type));
    html.push_str(&item("Details", &request.details));
    html.push_str(&optional_items(request));
    html.push_str("</ul>\n<p>Please review and take action:</p>\n");
    html.push_str(&format!(
        concat!(
            "<div style=\"display: inline-block; white-space: nowrap;\">\n",
            "<a href=\"{}\" style=\"display: inline-block; padding: 10px 20px; ",
            "background-color: #28a745; color: white; text-decoration: none; ",
            "border-radius: 5px;\">Approve</a>\n",
            "<a href=\"{}\" style=\"display: inline-block; padding: 10px 20px; ",
            "background-color: #dc3545; color: white; text-decoration: none; ",
            "border-radius: 5px; margin-left: 10px;\">Disapprove</a>\n",
            "</div>\n"
        ),
        escape_html(&approve),
        escape_html(&disapprove)
    ));

    OutgoingMail {
        from: from.to_string(),
        to: to.to_string(),
        subject: format!(
            "IT Request for Approval from {} - Department: {}",
            request.requester_name, request.department
        ),
        html,
    }
}

/// IT-team mail once a manager approved.
pub fn approved_mail(request: &ServiceRequest, from: &str, to: &str) -> OutgoingMail {
    let mut html = String::from("<h1>A new IT task has been assigned to your department.</h1>\n");
    html.push_str("<p>This request has been approved by the manager.</p>\n");
    html.push_str(&format!(
        "<h3>Request #{} Details:</h3>\n<ul>\n",
        request.id
    ));
    html.push_str(&item("Name", &request.requester_name));
    html.push_str(&item("Phone", &request.requester_phone));
    html.push_str(&item("Department", &request.department));
    html.push_str(&item("Service Type", &request.service_type));
    html.push_str(&item("Details", &request.details));
    html.push_str(&optional_items(request));
    html.push_str("</ul>\n");

    OutgoingMail {
        from: from.to_string(),
        to: to.to_string(),
        subject: format!(
            "[Approved] New IT Task Assigned from {} - Department: {}",
            request.requester_name, request.department
        ),
        html,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::NewServiceRequest;

    fn request() -> ServiceRequest {
        NewServiceRequest {
            submitted_at: "16/10/2026, 08:00:00".into(),
            requester_name: "Anong <script>".into(),
            requester_phone: "081-111".into(),
            department: "FA_dep".into(),
            position: "Accountant".into(),
            service_type: "Software".into(),
            details: "Needs \"spreadsheet\" & macros".into(),
            asset_id: String::new(),
            software_name: "Calc".into(),
            other_topic: String::new(),
            approval_token: "f00d".repeat(10),
        }
        .into_request(12, 4)
    }

    #[test]
    fn test_escape_html() {
        assert_eq!(escape_html("<a href='x'>&\"</a>"), "&lt;a href=&#39;x&#39;&gt;&amp;&quot;&lt;/a&gt;");
        assert_eq!(escape_html("plain"), "plain");
    }

    #[test]
    fn test_links_tolerate_trailing_slash() {
        assert_eq!(approve_link("https://desk.example.com/", "abc"), "https://desk.example.com/approve/abc");
        assert_eq!(disapprove_link("http://localhost:3000", "abc"), "http://localhost:3000/disapprove/abc");
    }

    #[test]
    fn test_submission_mail_carries_both_links() {
        let req = request();
        let mail = submission_mail(&req, "desk@example.com", "fa@example.com", "http://desk");
        assert_eq!(mail.to, "fa@example.com");
        assert_eq!(mail.from, "desk@example.com");
        assert!(mail.subject.contains("FA_dep"));
        assert!(mail.html.contains(&format!("http://desk/approve/{}", req.approval_token)));
        assert!(mail.html.contains(&format!("http://desk/disapprove/{}", req.approval_token)));
    }

    #[test]
    fn test_submission_mail_escapes_user_input() {
        let mail = submission_mail(&request(), "a@example.com", "b@example.com", "http://desk");
        assert!(!mail.html.contains("<script>"));
        assert!(mail.html.contains("Anong &lt;script&gt;"));
        assert!(mail.html.contains("&quot;spreadsheet&quot; &amp; macros"));
    }

    #[test]
    fn test_optional_fields_only_when_present() {
        let mail = submission_mail(&request(), "a@example.com", "b@example.com", "http://desk");
        assert!(mail.html.contains("Software Name"));
        assert!(!mail.html.contains("Asset ID"));
        assert!(!mail.html.contains("Topic"));
    }

    #[test]
    fn test_approved_mail_has_phone_and_no_links() {
        let req = request();
        let mail = approved_mail(&req, "a@example.com", "it@example.com");
        assert!(mail.subject.starts_with("[Approved]"));
        assert!(mail.html.contains("081-111"));
        assert!(mail.html.contains("Request #12"));
        assert!(!mail.html.contains(&req.approval_token));
    }
}
