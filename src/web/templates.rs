//! Embedded HTML templates.
//!
//! Registered with `.html` names so minijinja auto-escapes every value.

/// Base layout template. All pages extend this.
pub const LAYOUT: &str = r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="utf-8">
    <meta name="viewport" content="width=device-width, initial-scale=1">
    <title>{% block title %}sheetkey{% endblock %}</title>
    <style>
        :root {
            --bg-primary: #0f1117;
            --bg-secondary: #1a1d27;
            --border: #2e3245;
            --text-primary: #e1e4ed;
            --text-secondary: #8b8fa3;
            --success: #22c55e;
            --radius: 8px;
        }
        * { box-sizing: border-box; margin: 0; padding: 0; }
        body {
            font-family: -apple-system, BlinkMacSystemFont, "Segoe UI", Roboto, sans-serif;
            background: var(--bg-primary);
            color: var(--text-primary);
            line-height: 1.5;
        }
        .card {
            background: var(--bg-secondary);
            border: 1px solid var(--border);
            border-radius: var(--radius);
            padding: 1.5rem;
        }
        .text-secondary { color: var(--text-secondary); }
        .mt-1 { margin-top: 0.5rem; }
        .mt-2 { margin-top: 1rem; }
        code {
            display: block;
            word-break: break-all;
            font-size: 0.8125rem;
            padding: 0.75rem;
            border-radius: var(--radius);
            border: 1px solid var(--border);
            background: var(--bg-primary);
        }
    </style>
</head>
<body>
{% block body %}{% endblock %}
</body>
</html>"#;

/// Page shown to the browser after a completed authorization.
pub const AUTHORIZED: &str = r#"{% extends "layout.html" %}
{% block title %}Authorization Successful{% endblock %}
{% block body %}
<div style="display:flex;align-items:center;justify-content:center;min-height:100vh;padding:1rem;">
    <div class="card" style="width:100%;max-width:560px;">
        <div style="font-size:2.5rem;margin-bottom:0.75rem;color:var(--success);text-align:center;">&#10003;</div>
        <h2 style="font-size:1.25rem;font-weight:600;text-align:center;">Authorization Successful!</h2>
        <p class="text-secondary mt-2">Email</p>
        <p id="email">{{ email }}</p>
        <p class="text-secondary mt-2">Access Token</p>
        <code id="access-token">{{ access_token }}</code>
        <p class="text-secondary mt-2" style="font-size:0.8125rem;">
            You can close this window and return to your spreadsheet.
        </p>
    </div>
</div>
{% endblock %}"#;
