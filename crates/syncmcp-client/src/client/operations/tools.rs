//! Tool operations for MCP client
//!
//! Listing tools fills the descriptor cache; calling a tool consults it to
//! decide whether the result's `structuredContent` must be validated:
//!
//! | descriptor                 | result                   | outcome                 |
//! |----------------------------|--------------------------|-------------------------|
//! | no `outputSchema`          | anything                 | returned unchanged      |
//! | `outputSchema`             | `isError: true`          | returned unchanged      |
//! | `outputSchema`             | no `structuredContent`   | validation failure      |
//! | `outputSchema`             | conforming content       | returned unchanged      |
//! | `outputSchema`             | violating content        | validation failure      |

use std::collections::{HashMap, HashSet};

use serde_json::Value;
use tracing::{debug, warn};

use syncmcp_protocol::types::{
    CallToolRequest, CallToolResult, Cursor, ListToolsRequest, ListToolsResult, Tool,
};
use syncmcp_protocol::{McpError, McpResult, methods};
use syncmcp_transport_traits::Transport;

use crate::client::core::Client;

/// Listings `call_tool` attempts before giving up on finding a stable tool set
const MAX_LISTING_ATTEMPTS: usize = 3;

/// Tools gathered by a full listing
struct Listing {
    tools: Vec<Tool>,
    /// `false` if the cache was invalidated while the pages were fetched
    complete: bool,
}

impl<T: Transport + 'static> Client<T> {
    /// List every tool the server offers.
    ///
    /// Follows `nextCursor` until the last page and merges each page into the
    /// descriptor cache, replacing entries with the same name.
    ///
    /// # Errors
    ///
    /// Fails with `NotReady` before the handshake, or with the error of any
    /// page's round trip. A server that repeats a cursor is reported as
    /// `InvalidResponse`.
    ///
    /// # Examples
    ///
    /// ```rust,no_run
    /// # use syncmcp_client::Client;
    /// # use syncmcp_transport_traits::Transport;
    /// # async fn example<T: Transport + 'static>(client: Client<T>) -> syncmcp_protocol::McpResult<()> {
    /// client.initialize().await?;
    /// for tool in client.list_tools().await? {
    ///     println!("{} validated: {}", tool.name, tool.declares_output_schema());
    /// }
    /// # Ok(())
    /// # }
    /// ```
    pub async fn list_tools(&self) -> McpResult<Vec<Tool>> {
        let _op = self.inner.session.enter(methods::LIST_TOOLS)?;
        Ok(self.fetch_all_tools().await?.tools)
    }

    /// Fetch one page of tools, starting after `cursor`.
    ///
    /// The page is merged into the descriptor cache.
    pub async fn list_tools_page(&self, cursor: Option<Cursor>) -> McpResult<ListToolsResult> {
        let _op = self.inner.session.enter(methods::LIST_TOOLS)?;
        let generation = self.inner.tools.generation();
        self.fetch_tools_page(generation, cursor).await
    }

    async fn fetch_tools_page(
        &self,
        generation: u64,
        cursor: Option<Cursor>,
    ) -> McpResult<ListToolsResult> {
        let params = match cursor {
            Some(cursor) => Some(serde_json::to_value(ListToolsRequest {
                cursor: Some(cursor),
            })?),
            None => None,
        };

        let page: ListToolsResult = self
            .inner
            .protocol
            .request(methods::LIST_TOOLS, params, self.inner.config.request_timeout)
            .await?;

        self.inner.tools.merge(generation, &page.tools);
        Ok(page)
    }

    async fn fetch_all_tools(&self) -> McpResult<Listing> {
        let generation = self.inner.tools.generation();
        let mut tools = Vec::new();
        let mut cursor: Option<Cursor> = None;
        let mut seen_cursors = HashSet::new();

        loop {
            let page = self.fetch_tools_page(generation, cursor.take()).await?;
            tools.extend(page.tools);

            match page.next_cursor {
                Some(next) if !next.is_empty() => {
                    if !seen_cursors.insert(next.clone()) {
                        return Err(McpError::invalid_response(format!(
                            "Server repeated tools/list cursor '{}'",
                            next
                        ))
                        .with_operation(methods::LIST_TOOLS));
                    }
                    cursor = Some(next);
                }
                _ => break,
            }
        }

        let complete = self.inner.tools.mark_populated(generation);
        if !complete {
            debug!(generation, "Tool list changed while listing; cache left unpopulated");
        }
        debug!(count = tools.len(), pages = seen_cursors.len() + 1, "Listed tools");
        Ok(Listing { tools, complete })
    }

    /// Call a tool and return its result.
    ///
    /// If output validation is enabled and the tool's descriptor is not
    /// cached yet, the tools are listed first; a listing interrupted by a
    /// `list_changed` notification is repeated. When the descriptor
    /// declares an `outputSchema`, the result's `structuredContent` must
    /// satisfy it; results flagged `isError` are returned without checking.
    /// A tool the server does not list is called without validation.
    ///
    /// # Errors
    ///
    /// - `NotReady` / `SessionClosed` if the session is not `Ready`
    /// - `Remote` if the server answers with a JSON-RPC error
    /// - `Validation` if the structured result violates the declared schema;
    ///   the message starts with "Validation failed" and lists every violation
    /// - `Timeout` or `Transport` if the round trip fails
    /// - `InvalidResponse` if the tool list changes during every listing
    pub async fn call_tool(
        &self,
        name: &str,
        arguments: Option<HashMap<String, Value>>,
    ) -> McpResult<CallToolResult> {
        let _op = self.inner.session.enter(methods::CALL_TOOL)?;

        let descriptor = if self.inner.config.validate_tool_output {
            self.descriptor_for(name).await?
        } else {
            None
        };

        let request = CallToolRequest {
            name: name.to_string(),
            arguments: Some(arguments.unwrap_or_default()),
            _meta: None,
        };

        let result: CallToolResult = self
            .inner
            .protocol
            .request(
                methods::CALL_TOOL,
                Some(serde_json::to_value(request)?),
                self.inner.config.request_timeout,
            )
            .await?;

        if let Some(tool) = descriptor {
            self.check_tool_output(&tool, &result)?;
        }

        Ok(result)
    }

    /// Descriptor for `name`, listing tools first if the cache holds no
    /// complete listing.
    ///
    /// Only a listing that finished without an intervening invalidation can
    /// establish that the server does not offer `name`.
    async fn descriptor_for(&self, name: &str) -> McpResult<Option<Tool>> {
        for attempt in 1..=MAX_LISTING_ATTEMPTS {
            if let Some(tool) = self.inner.tools.lookup(name) {
                return Ok(Some(tool));
            }
            if self.inner.tools.is_populated() {
                debug!(tool = name, "Tool not listed by server; skipping output validation");
                return Ok(None);
            }

            debug!(tool = name, attempt, "Tool descriptor not cached; listing tools");
            // Pages from a superseded listing never reach the cache, so the
            // next lookup only sees descriptors from the current tool list
            if !self.fetch_all_tools().await?.complete {
                debug!(tool = name, attempt, "Tool list changed during lookup; listing again");
            }
        }

        match self.inner.tools.lookup(name) {
            Some(tool) => Ok(Some(tool)),
            None if self.inner.tools.is_populated() => Ok(None),
            None => Err(McpError::invalid_response(format!(
                "Tool list kept changing while looking up '{}'",
                name
            ))
            .with_operation(methods::CALL_TOOL)),
        }
    }

    fn check_tool_output(&self, tool: &Tool, result: &CallToolResult) -> McpResult<()> {
        let Some(schema) = &tool.output_schema else {
            return Ok(());
        };

        if result.has_error() {
            debug!(tool = %tool.name, "Tool reported an error; skipping output validation");
            return Ok(());
        }

        let Some(structured) = &result.structured_content else {
            warn!(tool = %tool.name, "Tool declares an output schema but returned no structured content");
            return Err(McpError::validation(
                &tool.name,
                vec!["Tool declares an output schema but returned no structured content".to_string()],
            ));
        };

        let schema = schema.to_json()?;
        let outcome = self.inner.validator.validate(&schema, structured)?;
        if outcome.is_valid() {
            return Ok(());
        }

        warn!(
            tool = %tool.name,
            violations = outcome.violations().len(),
            "Tool output failed schema validation"
        );
        Err(McpError::validation(&tool.name, outcome.messages()))
    }
}
