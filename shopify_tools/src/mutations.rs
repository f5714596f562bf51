//! GraphQL documents for the payments apps API.

pub const PAYMENT_SESSION_RESOLVE: &str = r#"
mutation PaymentSessionResolve($id: ID!) {
  paymentSessionResolve(id: $id) {
    paymentSession {
      id
      state { ... on PaymentSessionStateResolved { code } }
      nextAction { action context { ... on PaymentSessionActionsRedirect { redirectUrl } } }
    }
    userErrors { field message }
  }
}"#;

pub const PAYMENT_SESSION_REJECT: &str = r#"
mutation PaymentSessionReject($id: ID!, $reason: PaymentSessionRejectionReasonInput!) {
  paymentSessionReject(id: $id, reason: $reason) {
    paymentSession {
      id
      state { ... on PaymentSessionStateRejected { code reason merchantMessage } }
      nextAction { action context { ... on PaymentSessionActionsRedirect { redirectUrl } } }
    }
    userErrors { field message }
  }
}"#;

pub const PAYMENT_SESSION_PENDING: &str = r#"
mutation PaymentSessionPending($id: ID!, $pendingExpiresAt: DateTime!, $reason: PaymentSessionStatePendingReason!) {
  paymentSessionPending(id: $id, pendingExpiresAt: $pendingExpiresAt, reason: $reason) {
    paymentSession {
      id
      state { ... on PaymentSessionStatePending { reason } }
      nextAction { action context { ... on PaymentSessionActionsRedirect { redirectUrl } } }
    }
    userErrors { field message }
  }
}"#;

pub const REFUND_SESSION_RESOLVE: &str = r#"
mutation RefundSessionResolve($id: ID!) {
  refundSessionResolve(id: $id) {
    refundSession { id state { ... on RefundSessionStateResolved { code } } }
    userErrors { field message }
  }
}"#;

pub const REFUND_SESSION_REJECT: &str = r#"
mutation RefundSessionReject($id: ID!, $reason: RefundSessionRejectionReasonInput!) {
  refundSessionReject(id: $id, reason: $reason) {
    refundSession { id state { ... on RefundSessionStateRejected { code reason merchantMessage } } }
    userErrors { field message }
  }
}"#;

pub const CAPTURE_SESSION_RESOLVE: &str = r#"
mutation CaptureSessionResolve($id: ID!) {
  captureSessionResolve(id: $id) {
    captureSession { id state { ... on CaptureSessionStateResolved { code } } }
    userErrors { field message }
  }
}"#;

pub const CAPTURE_SESSION_REJECT: &str = r#"
mutation CaptureSessionReject($id: ID!, $reason: CaptureSessionRejectionReasonInput!) {
  captureSessionReject(id: $id, reason: $reason) {
    captureSession { id state { ... on CaptureSessionStateRejected { code reason merchantMessage } } }
    userErrors { field message }
  }
}"#;

pub const VOID_SESSION_RESOLVE: &str = r#"
mutation VoidSessionResolve($id: ID!) {
  voidSessionResolve(id: $id) {
    voidSession { id state { ... on VoidSessionStateResolved { code } } }
    userErrors { field message }
  }
}"#;

pub const VOID_SESSION_REJECT: &str = r#"
mutation VoidSessionReject($id: ID!, $reason: VoidSessionRejectionReasonInput!) {
  voidSessionReject(id: $id, reason: $reason) {
    voidSession { id state { ... on VoidSessionStateRejected { code reason merchantMessage } } }
    userErrors { field message }
  }
}"#;

pub const PAYMENTS_APP_CONFIGURE: &str = r#"
mutation PaymentsAppConfigure($externalHandle: String, $ready: Boolean!) {
  paymentsAppConfigure(externalHandle: $externalHandle, ready: $ready) {
    paymentsAppConfiguration { externalHandle ready }
    userErrors { field message }
  }
}"#;
