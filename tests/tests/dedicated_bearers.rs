use anyhow::ensure;
use sgwc::protocols::ies::*;
use sgwc_tests::{MmeSession, MockMme, MockPgw, PGW_IP, PgwSession, framework::*};

// Establishes a connected session and adds dedicated bearer 6 to it.
async fn session_with_dedicated_bearer(
    mme: &mut MockMme,
    pgw: &mut MockPgw,
) -> anyhow::Result<(MmeSession, PgwSession)> {
    let (session, pgw_session) = establish_session(mme, pgw, IMSI_1, "internet", 5).await?;
    connect_enb(mme, &session, 1).await?;
    pgw.send_create_bearer_request(&pgw_session, 1).await?;
    let r = mme.receive_create_bearer_request().await?;
    mme.send_create_bearer_response(
        &session,
        &r,
        Cause::RequestAccepted,
        &[(6, Cause::RequestAccepted)],
    )
    .await?;
    let response = pgw.receive_create_bearer_response().await?;
    ensure!(response.cause == Cause::RequestAccepted);
    Ok((session, pgw_session))
}

#[async_std::test]
async fn create_dedicated_bearer() -> anyhow::Result<()> {
    let (mut mme, mut pgw, sgwc, store, _logger) = init().await?;
    let (session, pgw_session) =
        establish_session(&mut mme, &mut pgw, IMSI_1, "internet", 5).await?;
    connect_enb(&mut mme, &session, 1).await?;

    // When the PGW asks for a dedicated bearer
    let sequence_number = pgw.send_create_bearer_request(&pgw_session, 1).await?;

    // Then the MME is asked to set it up, linked to the default bearer
    let r = mme.receive_create_bearer_request().await?;
    ensure!(r.teid == session.mme_s11_teid);
    ensure!(r.lbi == Ebi(5));
    ensure!(r.bearer_contexts.len() == 1);
    let s1u_sgw_fteid = r.bearer_contexts[0].s1u_sgw_fteid;
    ensure!(s1u_sgw_fteid.interface_type == InterfaceType::S1uSgwGtpU);
    ensure!(Some(s1u_sgw_fteid.teid) != session.s1u_sgw_fteid.map(|f| f.teid));

    // When the MME assigns it bearer ID 6
    mme.send_create_bearer_response(
        &session,
        &r,
        Cause::RequestAccepted,
        &[(6, Cause::RequestAccepted)],
    )
    .await?;

    // Then the PGW hears of it under its own sequence number
    let response = pgw.receive_create_bearer_response().await?;
    ensure!(response.cause == Cause::RequestAccepted);
    ensure!(response.teid == pgw_session.pgw_s5s8_cp_fteid.teid);
    ensure!(response.sequence_number == sequence_number);
    ensure!(response.pgw_cp_address == Some(PGW_IP));
    ensure!(response.bearer_contexts.len() == 1);
    ensure!(response.bearer_contexts[0].ebi == Some(Ebi(6)));
    ensure!(response.bearer_contexts[0].cause == Cause::RequestAccepted);
    ensure!(response.bearer_contexts[0].sgw_s5s8_up_fteid.is_some());

    // And the bearer is part of the session, with its tunnel programmed
    let record = session_record(&mut mme, &store, pgw_session.context_teid)
        .await?
        .unwrap();
    let bearer = record.pdn.bearer(Ebi(6)).unwrap();
    ensure!(bearer.sgw_s1u == s1u_sgw_fteid);
    ensure!(bearer.ue_ipv4() == Some(MockPgw::ue_ipv4(pgw_session.context_teid)));
    ensure!(record.pdn.procedures().is_empty());
    ensure!(sgwc.forwarding_table().tunnel(s1u_sgw_fteid.teid).is_some());
    Ok(())
}

#[async_std::test]
async fn ue_refuses_dedicated_bearer() -> anyhow::Result<()> {
    let (mut mme, mut pgw, sgwc, store, _logger) = init().await?;
    let (session, pgw_session) =
        establish_session(&mut mme, &mut pgw, IMSI_1, "internet", 5).await?;
    connect_enb(&mut mme, &session, 1).await?;

    pgw.send_create_bearer_request(&pgw_session, 1).await?;
    let r = mme.receive_create_bearer_request().await?;
    mme.send_create_bearer_response(&session, &r, Cause::UeRefuses, &[(6, Cause::UeRefuses)])
        .await?;

    let response = pgw.receive_create_bearer_response().await?;
    ensure!(response.cause == Cause::UeRefuses);
    ensure!(response.bearer_contexts[0].cause == Cause::UeRefuses);

    // Nothing is left pending
    let record = session_record(&mut mme, &store, pgw_session.context_teid)
        .await?
        .unwrap();
    ensure!(record.pdn.bearer(Ebi(6)).is_none());
    ensure!(record.pdn.procedures().is_empty());
    ensure!(sgwc.forwarding_table().num_tunnels() == 1);
    Ok(())
}

#[async_std::test]
async fn dedicated_bearers_partially_accepted() -> anyhow::Result<()> {
    let (mut mme, mut pgw, _sgwc, store, _logger) = init().await?;
    let (session, pgw_session) =
        establish_session(&mut mme, &mut pgw, IMSI_1, "internet", 5).await?;

    // When the PGW asks for two bearers and the UE takes only the first
    pgw.send_create_bearer_request(&pgw_session, 2).await?;
    let r = mme.receive_create_bearer_request().await?;
    ensure!(r.bearer_contexts.len() == 2);
    mme.send_create_bearer_response(
        &session,
        &r,
        Cause::RequestAccepted,
        &[(6, Cause::RequestAccepted), (7, Cause::UeRefuses)],
    )
    .await?;

    // Then the PGW gets a partial acceptance
    let response = pgw.receive_create_bearer_response().await?;
    ensure!(response.cause == Cause::RequestAcceptedPartially);
    ensure!(response.bearer_contexts[0].cause == Cause::RequestAccepted);
    ensure!(response.bearer_contexts[1].cause == Cause::UeRefuses);

    let record = session_record(&mut mme, &store, pgw_session.context_teid)
        .await?
        .unwrap();
    ensure!(record.pdn.bearer(Ebi(6)).is_some());
    ensure!(record.pdn.bearer(Ebi(7)).is_none());
    Ok(())
}

#[async_std::test]
async fn create_bearer_unknown_session() -> anyhow::Result<()> {
    let (mut mme, mut pgw, _sgwc, _store, _logger) = init().await?;
    let (_, mut pgw_session) =
        establish_session(&mut mme, &mut pgw, IMSI_1, "internet", 5).await?;
    pgw_session.context_teid = Teid(0x9999);

    pgw.send_create_bearer_request(&pgw_session, 1).await?;
    let response = pgw.receive_create_bearer_response().await?;
    ensure!(response.cause == Cause::ContextNotFound);
    ensure!(response.teid == Teid(0));
    mme.sync().await?;
    Ok(())
}

#[async_std::test]
async fn delete_dedicated_bearer_partially_found() -> anyhow::Result<()> {
    let (mut mme, mut pgw, sgwc, store, _logger) = init().await?;
    let (session, pgw_session) = session_with_dedicated_bearer(&mut mme, &mut pgw).await?;
    ensure!(sgwc.forwarding_table().num_tunnels() == 2);

    // When the PGW deletes bearers 6 and 9, of which only 6 exists
    let sequence_number = pgw
        .send_delete_bearer_request(&pgw_session, vec![Ebi(6), Ebi(9)])
        .await?;

    // Then the MME is asked to delete 6 only
    let r = mme.receive_delete_bearer_request().await?;
    ensure!(r.ebis == vec![Ebi(6)]);
    ensure!(!r.delete_default_bearer);
    ensure!(r.lbi.is_none());

    // When the MME agrees
    mme.send_delete_bearer_response(&session, &r, Cause::RequestAccepted)
        .await?;

    // Then the PGW hears that 6 went and 9 was not found
    let response = pgw.receive_delete_bearer_response().await?;
    ensure!(response.sequence_number == sequence_number);
    ensure!(response.cause == Cause::RequestAcceptedPartially);
    ensure!(response.bearer_contexts.len() == 2);
    ensure!(response.bearer_contexts[0].ebi == Ebi(6));
    ensure!(response.bearer_contexts[0].cause == Cause::RequestAccepted);
    ensure!(response.bearer_contexts[1].ebi == Ebi(9));
    ensure!(response.bearer_contexts[1].cause == Cause::ContextNotFound);

    // And the session carries on with its default bearer
    let record = session_record(&mut mme, &store, pgw_session.context_teid)
        .await?
        .unwrap();
    ensure!(record.pdn.bearer(Ebi(6)).is_none());
    ensure!(record.pdn.bearer(Ebi(5)).is_some());
    ensure!(record.pdn.procedures().is_empty());
    ensure!(sgwc.forwarding_table().num_tunnels() == 1);
    Ok(())
}

#[async_std::test]
async fn delete_default_bearer_deletes_session() -> anyhow::Result<()> {
    let (mut mme, mut pgw, sgwc, store, _logger) = init().await?;
    let (session, pgw_session) = session_with_dedicated_bearer(&mut mme, &mut pgw).await?;

    // When the PGW deletes the default bearer
    pgw.send_delete_bearer_request(&pgw_session, vec![Ebi(5)])
        .await?;

    // Then the MME is told the whole connection is going
    let r = mme.receive_delete_bearer_request().await?;
    ensure!(r.delete_default_bearer);
    ensure!(r.lbi == Some(Ebi(5)));
    mme.send_delete_bearer_response(&session, &r, Cause::RequestAccepted)
        .await?;

    // And the session goes with all its bearers
    let response = pgw.receive_delete_bearer_response().await?;
    ensure!(response.cause == Cause::RequestAccepted);
    ensure!(response.bearer_contexts.len() == 2);
    ensure!(
        session_record(&mut mme, &store, pgw_session.context_teid)
            .await?
            .is_none()
    );
    ensure!(sgwc.forwarding_table().num_tunnels() == 0);
    Ok(())
}

#[async_std::test]
async fn delete_only_unknown_bearers() -> anyhow::Result<()> {
    let (mut mme, mut pgw, _sgwc, _store, _logger) = init().await?;
    let (_, pgw_session) = establish_session(&mut mme, &mut pgw, IMSI_1, "internet", 5).await?;

    pgw.send_delete_bearer_request(&pgw_session, vec![Ebi(9)])
        .await?;

    // The PGW is answered directly and the MME is not involved
    let response = pgw.receive_delete_bearer_response().await?;
    ensure!(response.cause == Cause::RequestRejected);
    ensure!(response.bearer_contexts.len() == 1);
    ensure!(response.bearer_contexts[0].ebi == Ebi(9));
    ensure!(response.bearer_contexts[0].cause == Cause::ContextNotFound);
    mme.sync().await?;
    Ok(())
}

#[async_std::test]
async fn mme_refuses_bearer_deletion() -> anyhow::Result<()> {
    let (mut mme, mut pgw, _sgwc, store, _logger) = init().await?;
    let (session, pgw_session) = session_with_dedicated_bearer(&mut mme, &mut pgw).await?;

    pgw.send_delete_bearer_request(&pgw_session, vec![Ebi(6)])
        .await?;
    let r = mme.receive_delete_bearer_request().await?;
    mme.send_delete_bearer_response(&session, &r, Cause::RequestRejected)
        .await?;

    let response = pgw.receive_delete_bearer_response().await?;
    ensure!(response.cause == Cause::RequestRejected);
    let record = session_record(&mut mme, &store, pgw_session.context_teid)
        .await?
        .unwrap();
    ensure!(record.pdn.bearer(Ebi(6)).is_some());
    Ok(())
}
