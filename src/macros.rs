/// Declares a behavior together with an extension trait that calls it like a method.
///
/// ```
/// # use erased::{Erased, MutInvoker, RefInvoker};
/// erased::behavior! {
///     /// Reads the counter.
///     pub Get as GetExt: fn get(&self) -> u32;
/// }
///
/// erased::behavior! {
///     /// Bumps the counter.
///     pub Add as AddExt: fn add(&mut self, n: u32);
/// }
///
/// struct Counter(u32);
///
/// impl RefInvoker<Counter> for Get {
///     fn invoke(this: &Counter, (): ()) -> u32 {
///         this.0
///     }
/// }
///
/// impl MutInvoker<Counter> for Add {
///     fn invoke(this: &mut Counter, (n,): (u32,)) {
///         this.0 += n;
///     }
/// }
///
/// let mut a: Erased<(Get, Add)> = Erased::new(Counter(1));
/// a.add(2);
///
/// assert_eq!(a.get(), 3);
/// ```
///
/// The declared struct is the behavior tag, usable with
/// [`BasicErased::invoke`](crate::BasicErased::invoke) as well.
/// The extension trait is implemented for every type and its method is available
/// wherever the behavior can be dispatched: containers and views whose behavior list has it.
#[macro_export]
macro_rules! behavior {
    (@output) => { () };
    (@output $ret:ty) => { $ret };

    (
        $(#[$meta:meta])*
        $vis:vis $name:ident as $ext:ident: fn $method:ident(&self $(, $arg:ident: $ty:ty)* $(,)?) $(-> $ret:ty)?;
    ) => {
        $(#[$meta])*
        #[derive(::core::clone::Clone, ::core::marker::Copy, ::core::fmt::Debug, ::core::default::Default)]
        $vis struct $name;

        impl $crate::Behavior for $name {
            type Receiver = $crate::Shared;
            type Args = ($($ty,)*);
            type Output = $crate::behavior!(@output $($ret)?);
        }

        #[doc = concat!("Calls [`", stringify!($name), "`] as a method.")]
        $vis trait $ext {
            #[inline(always)]
            fn $method<I>(&self $(, $arg: $ty)*) -> $crate::behavior!(@output $($ret)?)
            where
                Self: $crate::Dispatch<$name, I>,
            {
                <Self as $crate::Dispatch<$name, I>>::dispatch(self, ($($arg,)*))
            }
        }

        impl<C: ?::core::marker::Sized> $ext for C {}
    };

    (
        $(#[$meta:meta])*
        $vis:vis $name:ident as $ext:ident: fn $method:ident(&mut self $(, $arg:ident: $ty:ty)* $(,)?) $(-> $ret:ty)?;
    ) => {
        $(#[$meta])*
        #[derive(::core::clone::Clone, ::core::marker::Copy, ::core::fmt::Debug, ::core::default::Default)]
        $vis struct $name;

        impl $crate::Behavior for $name {
            type Receiver = $crate::Exclusive;
            type Args = ($($ty,)*);
            type Output = $crate::behavior!(@output $($ret)?);
        }

        #[doc = concat!("Calls [`", stringify!($name), "`] as a method.")]
        $vis trait $ext {
            #[inline(always)]
            fn $method<I>(&mut self $(, $arg: $ty)*) -> $crate::behavior!(@output $($ret)?)
            where
                Self: $crate::DispatchMut<$name, I>,
            {
                <Self as $crate::DispatchMut<$name, I>>::dispatch_mut(self, ($($arg,)*))
            }
        }

        impl<C: ?::core::marker::Sized> $ext for C {}
    };
}
