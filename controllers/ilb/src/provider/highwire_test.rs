//! Unit tests for the Highwire provider

#[cfg(test)]
mod tests {
    use crate::provider::{HighwireProvider, LoadBalancerProvider, ProviderError};
    use crate::test_utils::*;
    use crds::{IlbState, OperatorMessage, POOL_MISSING_MESSAGE, READY_MESSAGE, VIP_MISSING_MESSAGE};
    use highwire_client::{Pool, PoolMember, VirtualServer};

    fn message(ilb: &crds::Ilb) -> OperatorMessage {
        ilb.status
            .as_ref()
            .and_then(|s| OperatorMessage::decode(&s.message))
            .unwrap()
    }

    fn member(ip: &str) -> PoolMember {
        PoolMember {
            ip: ip.to_string(),
            port: "443".to_string(),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_get_status_on_empty_provider() {
        let provider = HighwireProvider::new(mock_highwire());
        let mut ilb = create_test_ilb("web", &["10.0.0.5"]);

        provider.get_status(&mut ilb).await.unwrap();

        let status = ilb.status.as_ref().unwrap();
        assert_eq!(status.name, "web");
        assert_eq!(status.state, IlbState::Pending);
        assert_eq!(status.conditions, Default::default());
        assert_eq!(message(&ilb).message, "Provisioning load balancer");
    }

    #[tokio::test]
    async fn test_get_status_finds_objects_by_managed_name() {
        let mock = mock_highwire();
        mock.add_virtual_server(VirtualServer {
            id: 42,
            ip: "10.1.1.1".to_string(),
            name: "/Common/lbauto-web-vip".to_string(),
            environment: VIP_ENVIRONMENT,
            pool: 7,
            ..Default::default()
        });
        mock.add_pool(Pool {
            id: 7,
            name: "/Common/lbauto-web-pool".to_string(),
            environment: POOL_ENVIRONMENT,
            ..Default::default()
        });
        let provider = HighwireProvider::new(mock);
        let mut ilb = create_test_ilb("web", &["10.0.0.5"]);

        provider.get_status(&mut ilb).await.unwrap();

        let status = ilb.status.as_ref().unwrap();
        assert_eq!(status.vip, "10.1.1.1");
        assert_eq!(status.vip_id, 42);
        assert_eq!(status.pool_id, 7);
        assert!(status.conditions.all_met());
        assert_eq!(status.state, IlbState::Ready);
        assert_eq!(message(&ilb).message, READY_MESSAGE);
    }

    #[tokio::test]
    async fn test_get_status_skips_pool_lookup_without_pool_name() {
        let mock = mock_highwire();
        // A stray pool whose short name is the bare prefix
        mock.add_pool(Pool {
            id: 7,
            name: "/Common/lbauto-".to_string(),
            environment: POOL_ENVIRONMENT,
            ..Default::default()
        });
        let provider = HighwireProvider::new(mock);
        let mut ilb = create_test_ilb("web", &[]);
        ilb.spec.pool.name.clear();

        provider.get_status(&mut ilb).await.unwrap();

        let status = ilb.status.as_ref().unwrap();
        assert!(!status.conditions.pool_created);
        assert_eq!(status.pool_id, 0);
    }

    #[tokio::test]
    async fn test_get_status_ignores_other_environments() {
        let mock = mock_highwire();
        mock.add_pool(Pool {
            id: 7,
            name: "/Common/lbauto-web-pool".to_string(),
            environment: VIP_ENVIRONMENT,
            ..Default::default()
        });
        let provider = HighwireProvider::new(mock);
        let mut ilb = create_test_ilb("web", &["10.0.0.5"]);

        provider.get_status(&mut ilb).await.unwrap();
        assert!(!ilb.conditions().pool_created);
    }

    #[tokio::test]
    async fn test_unlinked_pool_is_not_marked_linked() {
        let mock = mock_highwire();
        mock.add_virtual_server(VirtualServer {
            id: 42,
            name: "/Common/lbauto-web-vip".to_string(),
            environment: VIP_ENVIRONMENT,
            ..Default::default()
        });
        mock.add_pool(Pool {
            id: 7,
            name: "/Common/lbauto-web-pool".to_string(),
            environment: POOL_ENVIRONMENT,
            ..Default::default()
        });
        let provider = HighwireProvider::new(mock);
        let mut ilb = create_test_ilb("web", &["10.0.0.5"]);

        provider.get_status(&mut ilb).await.unwrap();
        assert!(ilb.conditions().awaiting_link());
        assert_eq!(ilb.state(), IlbState::Pending);
    }

    #[tokio::test]
    async fn test_missing_virtual_server_is_data_inconsistency() {
        let provider = HighwireProvider::new(mock_highwire());
        let mut ilb = provisioned(create_test_ilb("web", &["10.0.0.5"]), 42, 7);

        let err = provider.get_status(&mut ilb).await.unwrap_err();
        assert!(matches!(err, ProviderError::DataInconsistency(_)));

        let status = ilb.status.as_ref().unwrap();
        assert_eq!(status.state, IlbState::Error);
        assert_eq!(status.vip, "");
        assert_eq!(status.vip_id, 0);
        assert!(!status.conditions.vip_created);
        assert!(!status.conditions.vip_pool_linked);
        let msg = message(&ilb);
        assert_eq!(msg.error_code, 404);
        assert_eq!(msg.message, VIP_MISSING_MESSAGE);
    }

    #[tokio::test]
    async fn test_missing_pool_is_data_inconsistency() {
        let mock = mock_highwire();
        mock.add_virtual_server(VirtualServer {
            id: 42,
            name: "/Common/lbauto-web-vip".to_string(),
            environment: VIP_ENVIRONMENT,
            pool: 7,
            ..Default::default()
        });
        let provider = HighwireProvider::new(mock);
        let mut ilb = provisioned(create_test_ilb("web", &["10.0.0.5"]), 42, 7);

        let err = provider.get_status(&mut ilb).await.unwrap_err();
        assert!(matches!(err, ProviderError::DataInconsistency(_)));

        let status = ilb.status.as_ref().unwrap();
        assert_eq!(status.state, IlbState::Error);
        assert_eq!(status.pool_id, 0);
        assert!(!status.conditions.pool_created);
        assert!(status.conditions.vip_created);
        assert_eq!(message(&ilb).message, POOL_MISSING_MESSAGE);
    }

    #[tokio::test]
    async fn test_lookup_failure_is_recorded_on_status() {
        let mock = mock_highwire();
        mock.fail_with("list_virtual_servers", 401);
        let provider = HighwireProvider::new(mock);
        let mut ilb = create_test_ilb("web", &[]);

        let err = provider.get_status(&mut ilb).await.unwrap_err();
        assert!(matches!(err, ProviderError::Highwire(_)));
        let msg = message(&ilb);
        assert_eq!(msg.error_code, 401);
        assert!(msg.message.starts_with("Unauthorized:"));
    }

    #[tokio::test]
    async fn test_create_pool_sends_members_on_pool_port() {
        let mock = mock_highwire();
        let provider = HighwireProvider::new(mock.clone());
        let mut ilb = create_test_ilb("web", &["10.0.0.5", "10.0.0.6"]);

        provider.create_pool(&mut ilb).await.unwrap();

        let pools = mock.pools();
        assert_eq!(pools.len(), 1);
        assert_eq!(pools[0].name, "/Common/lbauto-web-pool");
        assert_eq!(pools[0].environment, POOL_ENVIRONMENT);
        let members = pools[0].members.clone().unwrap();
        assert_eq!(members.len(), 2);
        assert!(members.iter().all(|m| m.port == "443" && m.admin_state == "enabled"));
    }

    #[tokio::test]
    async fn test_create_failure_records_vendor_reason() {
        let mock = mock_highwire();
        mock.fail_with("create_virtual_server", 409);
        let provider = HighwireProvider::new(mock);
        let mut ilb = create_test_ilb("web", &[]);

        assert!(provider.create_virtual_server(&mut ilb).await.is_err());
        let msg = message(&ilb);
        assert_eq!(msg.error_code, 409);
        assert!(msg.message.starts_with("Conflict:"));
        assert!(msg.message.ends_with("(injected failure)"));
    }

    #[tokio::test]
    async fn test_link_points_virtual_server_at_pool() {
        let mock = mock_highwire();
        mock.add_virtual_server(VirtualServer {
            id: 42,
            name: "/Common/lbauto-web-vip".to_string(),
            environment: VIP_ENVIRONMENT,
            ..Default::default()
        });
        let provider = HighwireProvider::new(mock.clone());
        let mut ilb = provisioned(create_test_ilb("web", &["10.0.0.5"]), 42, 7);

        provider.link_vs_to_pool(&mut ilb).await.unwrap();

        assert_eq!(mock.calls(), vec!["PUT ltm/virtualServers/42".to_string()]);
        assert_eq!(mock.virtual_servers()[0].pool, 7);
    }

    #[tokio::test]
    async fn test_drift_replaces_members_once() {
        let mock = mock_highwire();
        mock.add_pool(Pool {
            id: 7,
            name: "/Common/lbauto-web-pool".to_string(),
            environment: POOL_ENVIRONMENT,
            members: Some(vec![member("10.0.0.1"), member("10.0.0.2")]),
            ..Default::default()
        });
        let provider = HighwireProvider::new(mock.clone());
        let mut ilb = provisioned(create_test_ilb("web", &["10.0.0.1", "10.0.0.2", "10.0.0.3"]), 42, 7);

        provider.observe_current_and_reconcile(&mut ilb).await.unwrap();

        assert_eq!(mock.count_calls("PUT ltm/pools/7/members"), 1);
        let ips = mock.pools()[0].member_ips();
        assert_eq!(ips, vec!["10.0.0.1", "10.0.0.2", "10.0.0.3"]);
        assert_eq!(ilb.state(), IlbState::Ready);

        // Converged: a second observation writes nothing
        provider.observe_current_and_reconcile(&mut ilb).await.unwrap();
        assert_eq!(mock.count_calls("PUT ltm/pools/7/members"), 1);
    }

    #[tokio::test]
    async fn test_no_drift_for_reordered_members() {
        let mock = mock_highwire();
        mock.add_pool(Pool {
            id: 7,
            environment: POOL_ENVIRONMENT,
            members: Some(vec![member("10.0.0.2"), member("10.0.0.1")]),
            ..Default::default()
        });
        let provider = HighwireProvider::new(mock.clone());
        let mut ilb = provisioned(create_test_ilb("web", &["10.0.0.1", "10.0.0.2"]), 42, 7);

        provider.observe_current_and_reconcile(&mut ilb).await.unwrap();
        assert!(mock.calls().is_empty());
    }

    #[tokio::test]
    async fn test_failed_replace_leaves_pending() {
        let mock = mock_highwire();
        mock.add_pool(Pool {
            id: 7,
            environment: POOL_ENVIRONMENT,
            members: Some(vec![member("10.0.0.1")]),
            ..Default::default()
        });
        mock.fail_with("replace_pool_members", 500);
        let provider = HighwireProvider::new(mock);
        let mut ilb = provisioned(create_test_ilb("web", &["10.0.0.9"]), 42, 7);

        assert!(provider.observe_current_and_reconcile(&mut ilb).await.is_err());
        assert_eq!(ilb.state(), IlbState::Pending);
        assert_eq!(message(&ilb).error_code, 500);
    }

    #[tokio::test]
    async fn test_finalizers_delete_virtual_server_then_pool() {
        let mock = mock_highwire();
        mock.add_virtual_server(VirtualServer {
            id: 42,
            ..Default::default()
        });
        mock.add_pool(Pool {
            id: 7,
            ..Default::default()
        });
        let provider = HighwireProvider::new(mock.clone());
        let mut ilb = provisioned(create_test_ilb("web", &["10.0.0.5"]), 42, 7);

        provider.process_finalizers(&mut ilb).await.unwrap();

        assert_eq!(
            mock.calls(),
            vec![
                "DELETE ltm/virtualServers/42".to_string(),
                "DELETE ltm/pools/7".to_string()
            ]
        );
        assert!(mock.pools().is_empty());
        assert!(mock.virtual_servers().is_empty());
    }

    #[tokio::test]
    async fn test_finalizers_treat_not_found_as_deleted() {
        let mock = mock_highwire();
        let provider = HighwireProvider::new(mock.clone());
        let mut ilb = provisioned(create_test_ilb("web", &["10.0.0.5"]), 42, 7);

        provider.process_finalizers(&mut ilb).await.unwrap();
        // Repeating is harmless
        provider.process_finalizers(&mut ilb).await.unwrap();
        assert_eq!(mock.count_calls("DELETE"), 4);
    }

    #[tokio::test]
    async fn test_finalizers_skip_objects_never_created() {
        let mock = mock_highwire();
        let provider = HighwireProvider::new(mock.clone());
        let mut ilb = create_test_ilb("web", &[]);

        provider.process_finalizers(&mut ilb).await.unwrap();
        assert!(mock.calls().is_empty());
    }

    #[tokio::test]
    async fn test_finalizers_find_objects_created_before_ids_were_recorded() {
        let mock = mock_highwire();
        mock.add_virtual_server(VirtualServer {
            id: 42,
            name: "/Common/lbauto-web-vip".to_string(),
            environment: VIP_ENVIRONMENT,
            ..Default::default()
        });
        mock.add_pool(Pool {
            id: 7,
            name: "/Common/lbauto-web-pool".to_string(),
            environment: POOL_ENVIRONMENT,
            ..Default::default()
        });
        let provider = HighwireProvider::new(mock.clone());
        let mut ilb = create_test_ilb("web", &["10.0.0.5"]);

        provider.process_finalizers(&mut ilb).await.unwrap();

        assert_eq!(
            mock.calls(),
            vec![
                "DELETE ltm/virtualServers/42".to_string(),
                "DELETE ltm/pools/7".to_string()
            ]
        );
        assert!(mock.virtual_servers().is_empty());
        assert!(mock.pools().is_empty());
    }

    #[tokio::test]
    async fn test_finalizers_fail_when_lookup_fails() {
        let mock = mock_highwire();
        mock.fail_with("list_virtual_servers", 503);
        let provider = HighwireProvider::new(mock.clone());
        let mut ilb = create_test_ilb("web", &["10.0.0.5"]);

        let err = provider.process_finalizers(&mut ilb).await.unwrap_err();
        assert!(matches!(err, ProviderError::Cleanup(_)));
        assert!(message(&ilb).message.starts_with("Cleanup failed: virtual server lookup"));
    }

    #[tokio::test]
    async fn test_finalizers_attempt_pool_after_virtual_server_failure() {
        let mock = mock_highwire();
        mock.add_pool(Pool {
            id: 7,
            ..Default::default()
        });
        mock.fail_with("delete_virtual_server", 409);
        let provider = HighwireProvider::new(mock.clone());
        let mut ilb = provisioned(create_test_ilb("web", &["10.0.0.5"]), 42, 7);

        let err = provider.process_finalizers(&mut ilb).await.unwrap_err();
        assert!(matches!(err, ProviderError::Cleanup(_)));
        assert_eq!(mock.count_calls("DELETE ltm/pools/7"), 1);
        assert!(mock.pools().is_empty());
    }

    #[tokio::test]
    async fn test_finalizers_noop_when_already_terminated() {
        let mock = mock_highwire();
        let provider = HighwireProvider::new(mock.clone());
        let mut ilb = provisioned(create_test_ilb("web", &["10.0.0.5"]), 42, 7);
        ilb.status_mut().state = IlbState::Terminated;

        provider.process_finalizers(&mut ilb).await.unwrap();
        assert!(mock.calls().is_empty());
        assert_eq!(message(&ilb).message, "Deleting load balancer");
    }
}
