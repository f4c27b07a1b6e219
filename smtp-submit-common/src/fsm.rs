/// A pure state transition: given an input and a mutable context, produce
/// the next state. Implementors should not perform I/O here; the context
/// is where any commands-to-send or side effects are recorded for the
/// driving loop to act on afterwards.
pub trait FiniteStateMachine {
    type Input;
    type Context;

    #[must_use]
    fn transition(self, input: Self::Input, context: &mut Self::Context) -> Self;
}
