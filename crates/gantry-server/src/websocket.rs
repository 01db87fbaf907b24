//! WebSocket-based live reload.

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

/// Path of the live reload websocket.
pub const RELOAD_SOCKET_PATH: &str = "/__livereload";

/// Path the client script is served from.
pub const RELOAD_SCRIPT_PATH: &str = "/__livereload.js";

/// Messages sent to connected browsers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ReloadMessage {
    /// Connection established
    Connected,

    /// Full page reload
    Reload,

    /// Swap a stylesheet without reloading the page
    CssUpdate {
        /// URL path of the rebuilt stylesheet
        path: String,
    },
}

/// Hub for broadcasting reload messages to all connected clients.
#[derive(Debug, Clone)]
pub struct ReloadHub {
    sender: broadcast::Sender<ReloadMessage>,
}

impl ReloadHub {
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(100);
        Self { sender }
    }

    /// Send a message to all connected clients.
    pub fn send(&self, msg: ReloadMessage) {
        // No receivers is fine
        let _ = self.sender.send(msg);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ReloadMessage> {
        self.sender.subscribe()
    }

    /// Get the number of connected clients.
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for ReloadHub {
    fn default() -> Self {
        Self::new()
    }
}

/// Tag injected into served HTML pages.
pub fn client_script_tag() -> String {
    format!(r#"<script src="{}"></script>"#, RELOAD_SCRIPT_PATH)
}

/// Client-side live reload script.
///
/// The socket URL is derived from the page's own location so the script
/// works behind any host and port.
pub fn client_script() -> String {
    format!(
        r#"
(function() {{
  'use strict';

  var protocol = location.protocol === 'https:' ? 'wss:' : 'ws:';
  var url = protocol + '//' + location.host + '{socket}';
  var attempts = 0;
  var maxAttempts = 10;

  function refreshStylesheet(path) {{
    var links = document.querySelectorAll('link[rel="stylesheet"]');
    var found = false;

    links.forEach(function(link) {{
      var href = new URL(link.href, location.href);
      if (href.pathname === path) {{
        href.searchParams.set('t', Date.now());
        link.href = href.toString();
        found = true;
      }}
    }});

    return found;
  }}

  function connect() {{
    var ws = new WebSocket(url);

    ws.onopen = function() {{
      attempts = 0;
    }};

    ws.onmessage = function(event) {{
      var msg = JSON.parse(event.data);

      switch (msg.type) {{
        case 'reload':
          location.reload();
          break;

        case 'css_update':
          refreshStylesheet(msg.path);
          break;

        case 'connected':
          console.log('[livereload] connected');
          break;
      }}
    }};

    ws.onclose = function() {{
      if (attempts < maxAttempts) {{
        attempts++;
        setTimeout(connect, 1000 * attempts);
      }}
    }};
  }}

  connect();
}})();
"#,
        socket = RELOAD_SOCKET_PATH
    )
}
