//! Canonical structured event names used across `dynamic-router`.

// Router lifecycle events.
pub const ROUTER_START: &str = "router_start";
pub const ROUTER_START_FAILED: &str = "router_start_failed";
pub const ROUTER_SHUTDOWN: &str = "router_shutdown";

// Discovery and decode events.
pub const DISCOVERY_SUBSCRIBE_OK: &str = "discovery_subscribe_ok";
pub const DISCOVERY_SUBSCRIBE_FAILED: &str = "discovery_subscribe_failed";
pub const DISCOVERY_UNSUBSCRIBE_FAILED: &str = "discovery_unsubscribe_failed";
pub const DISCOVERY_RECEIVE: &str = "discovery_receive";
pub const DISCOVERY_DROP_UNDECODABLE: &str = "discovery_drop_undecodable";
pub const DISCOVERY_DISPATCH_QUEUE_FULL: &str = "discovery_dispatch_queue_full";
pub const DISCOVERY_DISPATCH_QUEUE_CLOSED: &str = "discovery_dispatch_queue_closed";

// Dispatch worker events.
pub const DISPATCH_WORKER_START: &str = "dispatch_worker_start";
pub const DISPATCH_WORKER_STOP: &str = "dispatch_worker_stop";

// Route installation events.
pub const ROUTE_INSTALL_SKIPPED: &str = "route_install_skipped";
pub const ROUTE_INSTALL_OK: &str = "route_install_ok";
pub const ROUTE_INSTALL_FAILED: &str = "route_install_failed";
pub const TOPIC_ROUTE_INSTALL_OK: &str = "topic_route_install_ok";
pub const TOPIC_ROUTE_INSTALL_FAILED: &str = "topic_route_install_failed";
pub const ROUTE_ROLLBACK_OK: &str = "route_rollback_ok";
pub const ROUTE_ROLLBACK_FAILED: &str = "route_rollback_failed";
pub const DOMAIN_TOPICS_CHANGED: &str = "domain_topics_changed";
pub const DOMAIN_TOPIC_IGNORED: &str = "domain_topic_ignored";
pub const DOMAIN_TOPIC_REMOVAL_DEFERRED: &str = "domain_topic_removal_deferred";

// Liveness events.
pub const LIVENESS_DISCOVERED: &str = "liveness_discovered";
pub const LIVENESS_UPDATED: &str = "liveness_updated";
pub const LIVENESS_TIMED_OUT: &str = "liveness_timed_out";
pub const LIVENESS_REMOVAL_RETRY: &str = "liveness_removal_retry";
pub const LIVENESS_RECORD_REMOVED: &str = "liveness_record_removed";

// Removal events.
pub const MODULE_REMOVAL_BOOKKEEPING: &str = "module_removal_bookkeeping";
pub const REMOVAL_START: &str = "removal_start";
pub const REMOVAL_OK: &str = "removal_ok";
pub const REMOVAL_PARTIAL: &str = "removal_partial";
pub const REMOVAL_ADMIN_CONNECT_FAILED: &str = "removal_admin_connect_failed";
pub const REMOVAL_ROUTE_REMOVED: &str = "removal_route_removed";
pub const REMOVAL_CHANNEL_REMOVED: &str = "removal_channel_removed";
pub const REMOVAL_ITEM_FAILED: &str = "removal_item_failed";
pub const ADMIN_SESSION_CLOSE_FAILED: &str = "admin_session_close_failed";
pub const ADMIN_SESSION_CLOSE_NO_RUNTIME: &str = "admin_session_close_no_runtime";
