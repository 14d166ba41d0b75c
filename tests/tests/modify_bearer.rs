use anyhow::ensure;
use sgwc::protocols::ies::*;
use sgwc_tests::{MockMme, MockPgw, framework::*};

#[async_std::test]
async fn modify_bearer_partially_found() -> anyhow::Result<()> {
    let (mut mme, mut pgw, sgwc, store, _logger) = init().await?;
    let (session, pgw_session) =
        establish_session(&mut mme, &mut pgw, IMSI_1, "internet", 5).await?;

    // When the MME modifies bearers 5 and 9, of which only 5 exists
    let enb_fteid = MockMme::enb_fteid(1, Ebi(5));
    mme.send_modify_bearer_request(
        &session,
        vec![(Ebi(5), enb_fteid), (Ebi(9), MockMme::enb_fteid(1, Ebi(9)))],
        vec![],
    )
    .await?;

    // Then bearer 5 is modified and 9 reported as not found
    let r = mme.receive_modify_bearer_response().await?;
    ensure!(r.teid == session.mme_s11_teid);
    ensure!(r.cause == Cause::RequestAccepted);
    ensure!(r.bearer_contexts_modified.len() == 1);
    ensure!(r.bearer_contexts_modified[0].ebi == Ebi(5));
    ensure!(Some(r.bearer_contexts_modified[0].s1u_sgw_fteid) == session.s1u_sgw_fteid);
    ensure!(r.bearer_contexts_not_found == vec![Ebi(9)]);

    // And the eNB endpoint is recorded and programmed
    let record = session_record(&mut mme, &store, pgw_session.context_teid)
        .await?
        .unwrap();
    ensure!(record.pdn.bearer(Ebi(5)).unwrap().enb_s1u == Some(enb_fteid));
    ensure!(record.pdn.bearer(Ebi(9)).is_none());
    let s1u_teid = session.s1u_sgw_fteid.unwrap().teid;
    let tunnel = sgwc.forwarding_table().tunnel(s1u_teid).unwrap();
    ensure!(tunnel.enb == enb_fteid);
    ensure!(tunnel.pgw == pgw_session.pgw_s5s8_up_fteid);
    Ok(())
}

#[async_std::test]
async fn modify_only_unknown_bearers() -> anyhow::Result<()> {
    let (mut mme, mut pgw, sgwc, store, _logger) = init().await?;
    let (session, pgw_session) =
        establish_session(&mut mme, &mut pgw, IMSI_1, "internet", 5).await?;
    let ue_ipv4 = MockPgw::ue_ipv4(pgw_session.context_teid);

    // Given an idle UE
    connect_enb(&mut mme, &session, 1).await?;
    mme.send_release_access_bearers_request(Some(session.imsi.imsi64), session.sgw_s11_teid)
        .await?;
    mme.receive_release_access_bearers_response().await?;
    ensure!(sgwc.forwarding_table().has_paging_rule(ue_ipv4));

    // When the MME modifies only a bearer that does not exist
    mme.send_modify_bearer_request(
        &session,
        vec![(Ebi(9), MockMme::enb_fteid(1, Ebi(9)))],
        vec![],
    )
    .await?;
    let r = mme.receive_modify_bearer_response().await?;
    ensure!(r.bearer_contexts_modified.is_empty());
    ensure!(r.bearer_contexts_not_found == vec![Ebi(9)]);

    // Then the session is otherwise unchanged and downlink still pages
    let record = session_record(&mut mme, &store, pgw_session.context_teid)
        .await?
        .unwrap();
    ensure!(record.pdn.bearer(Ebi(5)).unwrap().enb_s1u.is_none());
    ensure!(record.pdn.paging_rule == Some(ue_ipv4));
    ensure!(sgwc.forwarding_table().num_tunnels() == 0);
    ensure!(sgwc.forwarding_table().has_paging_rule(ue_ipv4));
    Ok(())
}

#[async_std::test]
async fn handover_sends_end_marker() -> anyhow::Result<()> {
    let (mut mme, mut pgw, sgwc, _store, _logger) = init().await?;
    let (session, _) = establish_session(&mut mme, &mut pgw, IMSI_1, "internet", 5).await?;
    let s1u_teid = session.s1u_sgw_fteid.unwrap().teid;

    // Given the UE on eNB 1
    connect_enb(&mut mme, &session, 1).await?;
    ensure!(sgwc.forwarding_table().num_end_markers() == 0);

    // When it moves to eNB 2
    connect_enb(&mut mme, &session, 2).await?;

    // Then an end marker goes down the old path and the tunnel follows the UE
    ensure!(sgwc.forwarding_table().num_end_markers() == 1);
    let tunnel = sgwc.forwarding_table().tunnel(s1u_teid).unwrap();
    ensure!(tunnel.enb == MockMme::enb_fteid(2, Ebi(5)));
    ensure!(sgwc.forwarding_table().num_tunnels() == 1);

    // A repeat of the same endpoint is not a path switch
    connect_enb(&mut mme, &session, 2).await?;
    ensure!(sgwc.forwarding_table().num_end_markers() == 1);
    Ok(())
}

#[async_std::test]
async fn modify_bearer_unknown_session() -> anyhow::Result<()> {
    let (mut mme, _pgw, _sgwc, _store, _logger) = init().await?;
    let mut session = mme.new_session(IMSI_1, 5)?;
    session.sgw_s11_teid = Teid(0x9999);

    mme.send_modify_bearer_request(
        &session,
        vec![(Ebi(5), MockMme::enb_fteid(1, Ebi(5)))],
        vec![],
    )
    .await?;

    // The rejection is addressed to the TEID the MME gave in the header
    let r = mme.receive_modify_bearer_response().await?;
    ensure!(r.cause == Cause::ContextNotFound);
    ensure!(r.teid == session.mme_s11_teid);
    Ok(())
}

#[async_std::test]
async fn modify_bearer_removes_dedicated_bearer() -> anyhow::Result<()> {
    let (mut mme, mut pgw, sgwc, store, _logger) = init().await?;
    let (session, pgw_session) =
        establish_session(&mut mme, &mut pgw, IMSI_1, "internet", 5).await?;
    connect_enb(&mut mme, &session, 1).await?;

    // Given a dedicated bearer 6
    pgw.send_create_bearer_request(&pgw_session, 1).await?;
    let r = mme.receive_create_bearer_request().await?;
    mme.send_create_bearer_response(
        &session,
        &r,
        Cause::RequestAccepted,
        &[(6, Cause::RequestAccepted)],
    )
    .await?;
    pgw.receive_create_bearer_response().await?;
    ensure!(sgwc.forwarding_table().num_tunnels() == 2);

    // When the MME removes bearers 5, 6 and 9
    mme.send_modify_bearer_request(&session, vec![], vec![Ebi(5), Ebi(6), Ebi(9)])
        .await?;

    // Then the default bearer stays, 6 goes and 9 is ignored
    let r = mme.receive_modify_bearer_response().await?;
    ensure!(r.cause == Cause::RequestAccepted);
    ensure!(r.bearer_contexts_marked_for_removal.len() == 2);
    ensure!(r.bearer_contexts_marked_for_removal[0].ebi == Ebi(5));
    ensure!(r.bearer_contexts_marked_for_removal[0].cause == Cause::RequestRejected);
    ensure!(r.bearer_contexts_marked_for_removal[1].ebi == Ebi(6));
    ensure!(r.bearer_contexts_marked_for_removal[1].cause == Cause::RequestAccepted);

    let record = session_record(&mut mme, &store, pgw_session.context_teid)
        .await?
        .unwrap();
    ensure!(record.pdn.bearer(Ebi(5)).is_some());
    ensure!(record.pdn.bearer(Ebi(6)).is_none());
    ensure!(sgwc.forwarding_table().num_tunnels() == 1);
    Ok(())
}
