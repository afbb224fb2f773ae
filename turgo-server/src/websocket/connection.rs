use std::collections::HashMap;
use std::fmt;
use std::time::{Duration, Instant};

use tokio::sync::{RwLock, mpsc};
use turgo_types::{ServerMessage, TeamId};
use uuid::Uuid;

/// Identity of one WebSocket connection. It doubles as the team id of whoever
/// creates or joins a game through it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionId(Uuid);

impl ConnectionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn team_id(&self) -> TeamId {
        self.0
    }
}

impl Default for ConnectionId {
    fn default() -> Self {
        Self::new()
    }
}

impl From<TeamId> for ConnectionId {
    fn from(team_id: TeamId) -> Self {
        Self(team_id)
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone)]
pub struct Connection {
    pub id: ConnectionId,
    pub last_activity: Instant,
    pub sender: mpsc::UnboundedSender<ServerMessage>,
}

impl Connection {
    pub fn new(id: ConnectionId) -> (Self, mpsc::UnboundedReceiver<ServerMessage>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        let now = Instant::now();

        let connection = Self {
            id,
            last_activity: now,
            sender,
        };

        (connection, receiver)
    }

    pub fn update_activity(&mut self) {
        self.last_activity = Instant::now();
    }

    pub fn send_message(&self, message: ServerMessage) -> Result<(), String> {
        self.sender
            .send(message)
            .map_err(|_| "Connection closed".to_string())
    }

    pub fn is_inactive(&self, timeout: Duration) -> bool {
        self.last_activity.elapsed() > timeout
    }
}

/// Outbound side of every live connection.
///
/// Removing a connection drops its sender, which ends the socket's outgoing
/// loop and with it the connection.
pub struct ConnectionManager {
    connections: RwLock<HashMap<ConnectionId, Connection>>,
}

impl ConnectionManager {
    pub fn new() -> Self {
        Self {
            connections: RwLock::new(HashMap::new()),
        }
    }

    pub async fn create_connection(
        &self,
        id: ConnectionId,
    ) -> mpsc::UnboundedReceiver<ServerMessage> {
        let (conn, receiver) = Connection::new(id);

        {
            let mut connections = self.connections.write().await;
            connections.insert(id, conn);
        }

        receiver
    }

    pub async fn remove_connection(&self, id: ConnectionId) -> bool {
        let mut connections = self.connections.write().await;
        connections.remove(&id).is_some()
    }

    pub async fn update_activity(&self, id: ConnectionId) {
        let mut connections = self.connections.write().await;
        if let Some(connection) = connections.get_mut(&id) {
            connection.update_activity();
        }
    }

    pub async fn send_to_connection(
        &self,
        id: ConnectionId,
        message: ServerMessage,
    ) -> Result<(), String> {
        let connections = self.connections.read().await;
        if let Some(connection) = connections.get(&id) {
            connection.send_message(message)
        } else {
            Err("Connection not found".to_string())
        }
    }

    /// Fan a message out to the given teams. Teams without a live connection are skipped.
    pub async fn send_to_teams(&self, team_ids: &[TeamId], message: ServerMessage) {
        let connections = self.connections.read().await;
        for team_id in team_ids {
            if let Some(connection) = connections.get(&ConnectionId::from(*team_id)) {
                if let Err(e) = connection.send_message(message.clone()) {
                    tracing::warn!("Failed to send to {}: {}", connection.id, e);
                }
            }
        }
    }

    /// Drop connections idle for longer than `timeout`, returning their ids.
    pub async fn cleanup_inactive_connections(&self, timeout: Duration) -> Vec<ConnectionId> {
        let inactive_connections: Vec<ConnectionId> = {
            let connections = self.connections.read().await;
            connections
                .values()
                .filter(|conn| conn.is_inactive(timeout))
                .map(|conn| conn.id)
                .collect()
        };

        for connection_id in &inactive_connections {
            tracing::info!("Removing inactive connection: {}", connection_id);
            self.remove_connection(*connection_id).await;
        }

        inactive_connections
    }

    pub async fn connection_count(&self) -> usize {
        let connections = self.connections.read().await;
        connections.len()
    }
}

impl Default for ConnectionManager {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use turgo_types::GameError;

    #[tokio::test]
    async fn test_connection_creation_and_removal() {
        let manager = ConnectionManager::new();
        let conn_id = ConnectionId::new();

        let _receiver = manager.create_connection(conn_id).await;
        assert_eq!(manager.connection_count().await, 1);

        assert!(manager.remove_connection(conn_id).await);
        assert!(!manager.remove_connection(conn_id).await);
        assert_eq!(manager.connection_count().await, 0);
    }

    #[test]
    fn test_team_id_round_trip() {
        let conn_id = ConnectionId::new();
        assert_eq!(ConnectionId::from(conn_id.team_id()), conn_id);
        assert_eq!(conn_id.to_string(), conn_id.team_id().to_string());
    }

    #[tokio::test]
    async fn test_activity_tracking_and_timeout() {
        let manager = ConnectionManager::new();
        let conn_id = ConnectionId::new();

        let _receiver = manager.create_connection(conn_id).await;

        let short_timeout = Duration::from_millis(10);
        assert!(manager.cleanup_inactive_connections(short_timeout).await.is_empty());
        assert_eq!(manager.connection_count().await, 1);

        tokio::time::sleep(Duration::from_millis(20)).await;
        let removed = manager.cleanup_inactive_connections(short_timeout).await;
        assert_eq!(removed, vec![conn_id]);
        assert_eq!(manager.connection_count().await, 0);
    }

    #[tokio::test]
    async fn test_removal_closes_receiver() {
        let manager = ConnectionManager::new();
        let conn_id = ConnectionId::new();

        let mut receiver = manager.create_connection(conn_id).await;
        manager.remove_connection(conn_id).await;
        assert!(receiver.recv().await.is_none());
    }

    #[tokio::test]
    async fn test_message_sending_to_nonexistent_connection() {
        let manager = ConnectionManager::new();

        let result = manager
            .send_to_connection(ConnectionId::new(), ServerMessage::GameLeft)
            .await;

        assert_eq!(result.unwrap_err(), "Connection not found");
    }

    #[tokio::test]
    async fn test_message_sending_after_connection_close() {
        let manager = ConnectionManager::new();
        let conn_id = ConnectionId::new();

        let receiver = manager.create_connection(conn_id).await;
        drop(receiver);

        let result = manager
            .send_to_connection(conn_id, ServerMessage::error(GameError::Internal))
            .await;

        assert_eq!(result.unwrap_err(), "Connection closed");
    }

    #[tokio::test]
    async fn test_send_to_teams() {
        let manager = ConnectionManager::new();
        let conn_id1 = ConnectionId::new();
        let conn_id2 = ConnectionId::new();
        let outsider = ConnectionId::new();

        let mut receiver1 = manager.create_connection(conn_id1).await;
        let mut receiver2 = manager.create_connection(conn_id2).await;
        let mut receiver3 = manager.create_connection(outsider).await;

        let teams = [conn_id1.team_id(), conn_id2.team_id(), uuid::Uuid::new_v4()];
        manager.send_to_teams(&teams, ServerMessage::GameStarted).await;

        assert!(matches!(receiver1.try_recv(), Ok(ServerMessage::GameStarted)));
        assert!(matches!(receiver2.try_recv(), Ok(ServerMessage::GameStarted)));
        assert!(receiver3.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_concurrent_connection_operations() {
        let manager = Arc::new(ConnectionManager::new());
        let mut handles = Vec::new();

        for _ in 0..50 {
            let manager_clone = manager.clone();
            let handle = tokio::spawn(async move {
                let conn_id = ConnectionId::new();
                let _receiver = manager_clone.create_connection(conn_id).await;

                tokio::time::sleep(Duration::from_millis(1)).await;

                manager_clone.update_activity(conn_id).await;
                manager_clone.remove_connection(conn_id).await;
            });
            handles.push(handle);
        }

        for handle in handles {
            handle.await.unwrap();
        }

        assert_eq!(manager.connection_count().await, 0);
    }
}
